//! Background validator supervision.
//!
//! `ensure_running` either adopts a validator recorded in the pidfile or
//! spawns a fresh one detached, logging to `validator.log`. The returned
//! handle owns teardown: `terminate` fires exactly once no matter how many
//! exit paths reach it, and `Drop` covers panics and early returns.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::types::PidRecord;
use crate::config::Config;
use crate::error::{Error, Result};

/// How long a freshly spawned validator gets before an early exit is
/// declared a launch failure (bad flags, port already bound).
const EARLY_EXIT_GRACE: Duration = Duration::from_millis(300);

/// SIGTERM-to-SIGKILL grace during teardown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct ValidatorHandle {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    /// True when the process pre-existed and was discovered via the pidfile.
    pub adopted: bool,
    child: Option<Child>,
    pidfile: PathBuf,
    terminated: AtomicBool,
}

/// Ensure exactly one validator is running for this environment.
///
/// A live pid record means adopt, never spawn a duplicate. A stale record
/// is removed and a fresh validator is spawned in its place.
pub async fn ensure_running(config: &Config) -> Result<ValidatorHandle> {
    let pidfile = config.pidfile_path();

    if let Some(record) = PidRecord::load(&pidfile) {
        if probe_alive(record.pid).await {
            info!(pid = record.pid, "validator already running, adopting");
            return Ok(ValidatorHandle {
                pid: record.pid,
                started_at: record.started_at,
                adopted: true,
                child: None,
                pidfile,
                terminated: AtomicBool::new(false),
            });
        }
        warn!(pid = record.pid, "stale validator record, removing");
        let _ = std::fs::remove_file(&pidfile);
    }

    std::fs::create_dir_all(&config.ledger_dir)?;
    let log = std::fs::File::create(config.validator_log_path())?;
    let log_err = log.try_clone()?;

    let mut child = Command::new(&config.validator_bin)
        .arg("--ledger")
        .arg(&config.ledger_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .spawn()
        .map_err(|e| Error::Spawn(format!("{}: {e}", config.validator_bin)))?;

    let pid = child
        .id()
        .ok_or_else(|| Error::spawn("validator exited before its pid was captured"))?;

    // A validator that dies within the grace window never bound its port;
    // surface that as a launch failure instead of a readiness timeout.
    tokio::time::sleep(EARLY_EXIT_GRACE).await;
    if let Some(status) = child.try_wait()? {
        return Err(Error::Spawn(format!(
            "{} exited immediately with {status}; see {}",
            config.validator_bin,
            config.validator_log_path().display()
        )));
    }

    let started_at = Utc::now();
    let record = PidRecord {
        pid,
        rpc_url: config.rpc_url.clone(),
        started_at,
    };
    record.write(&pidfile)?;
    info!(pid, ledger = %config.ledger_dir.display(), "validator launched");

    Ok(ValidatorHandle {
        pid,
        started_at,
        adopted: false,
        child: Some(child),
        pidfile,
        terminated: AtomicBool::new(false),
    })
}

impl ValidatorHandle {
    /// Tear the validator down. Exactly-once: the second and later calls
    /// are no-ops, and a pid that is already gone is swallowed silently.
    pub async fn terminate(&mut self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            debug!(pid = self.pid, "validator already terminated");
            return;
        }

        signal_term(self.pid).await;

        if let Some(mut child) = self.child.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(_) => {}
                Err(_) => {
                    warn!(pid = self.pid, "validator ignored SIGTERM, killing");
                    let _ = child.kill().await;
                }
            }
        } else {
            // Adopted process: poll until the pid stops answering.
            for _ in 0..20 {
                if !probe_alive(self.pid).await {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }

        let _ = std::fs::remove_file(&self.pidfile);
        info!(pid = self.pid, "validator stopped");
    }
}

impl Drop for ValidatorHandle {
    fn drop(&mut self) {
        if self.terminated.load(Ordering::SeqCst) {
            return;
        }
        // Unwind/early-return path: best-effort synchronous kill so no
        // orphaned validator survives the orchestrator.
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        } else {
            let _ = std::process::Command::new("kill")
                .arg(self.pid.to_string())
                .status();
        }
        let _ = std::fs::remove_file(&self.pidfile);
    }
}

/// Liveness probe: does `pid` still exist? `kill -0` delivers no signal.
pub async fn probe_alive(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Best-effort SIGTERM; a dead or foreign pid is a no-op.
pub async fn signal_term(pid: u32) {
    let result = Command::new("kill")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = result {
        debug!(pid, error = %e, "kill not delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_alive_sees_own_process() {
        assert!(probe_alive(std::process::id()).await);
    }

    #[tokio::test]
    async fn probe_alive_rejects_unused_pid() {
        // Top of the default pid_max range; effectively never allocated.
        assert!(!probe_alive(4_194_300).await);
    }

    #[tokio::test]
    async fn signal_term_on_dead_pid_is_noop() {
        signal_term(4_194_300).await;
    }

    #[tokio::test]
    async fn terminate_twice_is_noop() {
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut handle = ValidatorHandle {
            pid,
            started_at: Utc::now(),
            adopted: false,
            child: Some(child),
            pidfile: dir.path().join("validator.pid"),
            terminated: AtomicBool::new(false),
        };

        handle.terminate().await;
        assert!(!probe_alive(pid).await);
        // Second call must be a silent no-op.
        handle.terminate().await;
    }

    #[tokio::test]
    async fn terminate_adopted_dead_pid_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let mut handle = ValidatorHandle {
            pid: 4_194_300,
            started_at: Utc::now(),
            adopted: true,
            child: None,
            pidfile: dir.path().join("validator.pid"),
            terminated: AtomicBool::new(false),
        };
        handle.terminate().await;
        handle.terminate().await;
    }
}
