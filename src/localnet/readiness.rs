//! Readiness polling against the validator's health endpoint.
//!
//! The poller blocks the whole sequence: nothing past it (identity, funding,
//! deploy, the app itself) runs before the validator answers. The loop is
//! bounded; exhausting it is fatal rather than hanging the dev loop forever.

use std::time::Duration;

use tracing::{debug, info};

use super::types::ReadinessState;
use crate::config::Config;
use crate::error::{Error, Result};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One synchronous health probe. Any HTTP success counts as ready.
pub async fn check_once(client: &reqwest::Client, config: &Config) -> bool {
    match client.get(config.health_url()).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

/// Block until the validator answers its health endpoint, sleeping a fixed
/// interval between probes. Returns `Ready` or the fatal `ReadinessTimeout`.
pub async fn wait_until_ready(config: &Config) -> Result<ReadinessState> {
    let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;

    for attempt in 1..=config.max_attempts {
        if check_once(&client, config).await {
            info!(attempt, "validator ready");
            return Ok(ReadinessState::Ready);
        }
        debug!(attempt, url = %config.health_url(), "validator not ready yet");
        tokio::time::sleep(config.poll_interval).await;
    }

    Err(Error::ReadinessTimeout {
        attempts: config.max_attempts,
        waited_secs: config.poll_interval.as_secs() * u64::from(config.max_attempts),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(port: u16, max_attempts: u32) -> Config {
        let mut config = Config::default();
        config.rpc_url = format!("http://127.0.0.1:{port}");
        config.max_attempts = max_attempts;
        config.poll_interval = Duration::from_millis(20);
        config
    }

    #[tokio::test]
    async fn timeout_surfaces_as_error() {
        // Nothing listens on the port; every probe fails.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = config_for(port, 3);
        let err = wait_until_ready(&config).await.unwrap_err();
        match err {
            Error::ReadinessTimeout { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected ReadinessTimeout, got {other}"),
        }
    }

    #[tokio::test]
    async fn ready_once_endpoint_answers() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                use tokio::io::{AsyncReadExt, AsyncWriteExt};
                let mut buf = [0u8; 512];
                let _ = sock.read(&mut buf).await;
                let _ = sock
                    .write_all(
                        b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok",
                    )
                    .await;
            }
        });

        let config = config_for(port, 5);
        let state = wait_until_ready(&config).await.unwrap();
        assert_eq!(state, ReadinessState::Ready);
    }
}
