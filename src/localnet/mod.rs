//! Local ledger dev-environment orchestration.
//!
//! `run` drives the whole sequence: ensure the validator is up, wait for
//! readiness, provision the one-time identity (and, on a first run, fund it
//! and publish the program), then block on the foreground app. Teardown of
//! the validator is guaranteed on every exit path and fires exactly once.

pub mod foreground;
pub mod identity;
pub mod provision;
pub mod readiness;
pub mod types;
pub mod validator;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use types::{PidRecord, ReadinessState};

/// Run the full dev loop. Returns the exit code to mirror (the app's own).
pub async fn run(config: Config) -> Result<i32> {
    let mut handle = validator::ensure_running(&config).await?;

    // Everything past acquisition funnels through the same teardown,
    // whether the sequence succeeded, failed, or was interrupted. The
    // handle's Drop covers panic unwinds.
    let result = drive(&config).await;
    handle.terminate().await;
    result
}

async fn drive(config: &Config) -> Result<i32> {
    readiness::wait_until_ready(config).await?;

    let identity = identity::ensure_identity(config).await?;
    if identity.existed {
        info!("identity already provisioned, skipping airdrop and deploy");
    } else {
        let report = provision::fund_and_publish(config, &identity).await;
        let failed = report.iter().filter(|r| !r.succeeded()).count();
        if failed > 0 {
            warn!(failed, "provisioning finished with failures, launching app anyway");
        }
    }

    foreground::run_app(config).await
}

/// Read-only probe of the environment: pid record, liveness, health.
pub async fn status(config: &Config) -> Result<ReadinessState> {
    let state = match PidRecord::load(&config.pidfile_path()) {
        None => {
            println!("validator: not running");
            ReadinessState::NotStarted
        }
        Some(record) if validator::probe_alive(record.pid).await => {
            let client = reqwest::Client::new();
            if readiness::check_once(&client, config).await {
                println!("validator: ready (pid {}, since {})", record.pid, record.started_at);
                ReadinessState::Ready
            } else {
                println!("validator: starting (pid {}), health not answering", record.pid);
                ReadinessState::Polling
            }
        }
        Some(record) => {
            println!("validator: stale record (pid {} is gone)", record.pid);
            ReadinessState::NotStarted
        }
    };

    if config.keypair_path.exists() {
        println!("identity: present at {}", config.keypair_path.display());
    } else {
        println!("identity: absent");
    }

    Ok(state)
}

/// Tear down a validator left over from a previous session. Cleanup-safe:
/// a missing record or an already-dead pid is a no-op.
pub async fn down(config: &Config) -> Result<()> {
    let pidfile = config.pidfile_path();
    let Some(record) = PidRecord::load(&pidfile) else {
        info!("no validator record, nothing to stop");
        return Ok(());
    };

    if validator::probe_alive(record.pid).await {
        validator::signal_term(record.pid).await;
        for _ in 0..50 {
            if !validator::probe_alive(record.pid).await {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        info!(pid = record.pid, "validator stopped");
    } else {
        info!(pid = record.pid, "validator already gone");
    }

    let _ = std::fs::remove_file(&pidfile);
    Ok(())
}
