//! Foreground application launcher.
//!
//! The app inherits stdio and environment (plus the resolved RPC URL and
//! keypair location), and its exit drives teardown. The orchestrator stays
//! resident as the supervising parent so cleanup can run afterwards, then
//! mirrors the app's exit code as its own.

use std::os::unix::process::ExitStatusExt;

use tokio::process::Command;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// Run the app until it exits or a termination signal arrives. Returns the
/// exit code the orchestrator should mirror (128+signo for signal deaths).
pub async fn run_app(config: &Config) -> Result<i32> {
    let (bin, args) = config
        .app_command
        .split_first()
        .ok_or_else(|| Error::config("app command is empty"))?;

    info!(command = %config.app_command.join(" "), "launching app");

    let mut child = Command::new(bin)
        .args(args)
        .env("SOLANA_RPC_URL", &config.rpc_url)
        .env("SOLANA_KEYPAIR_PATH", &config.keypair_path)
        .spawn()
        .map_err(|e| Error::App(format!("{bin}: {e}")))?;

    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        status = child.wait() => {
            let status = status?;
            let code = exit_code(status);
            info!(code, "app exited");
            Ok(code)
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupt received, stopping app");
            stop_child(&mut child).await;
            Ok(130)
        }
        _ = sigterm.recv() => {
            warn!("termination requested, stopping app");
            stop_child(&mut child).await;
            Ok(143)
        }
    }
}

async fn stop_child(child: &mut tokio::process::Child) {
    let _ = child.start_kill();
    let _ = child.wait().await;
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|s| 128 + s))
        .unwrap_or(1)
}
