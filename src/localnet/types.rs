use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persisted duplicate-detection key for the background validator.
/// Written next to the ledger as `validator.pid`; a record whose pid no
/// longer answers a liveness probe is stale and gets replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PidRecord {
    pub pid: u32,
    pub rpc_url: String,
    pub started_at: DateTime<Utc>,
}

impl PidRecord {
    /// Read a record, tolerating absence and corruption (both mean "none").
    pub fn load(path: &std::path::Path) -> Option<Self> {
        let raw = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn write(&self, path: &std::path::Path) -> crate::error::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    NotStarted,
    Polling,
    Ready,
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not-started"),
            Self::Polling => write!(f, "polling"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// The one-time identity. `existed` distinguishes a warm environment (skip
/// funding and deploy entirely) from a first run.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub path: PathBuf,
    pub existed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Fund,
    BuildDeploy,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fund => write!(f, "fund"),
            Self::BuildDeploy => write!(f, "build-deploy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Failed(String),
}

/// Per-step provisioning result. Both steps are non-fatal by policy: the
/// report is logged and the sequence proceeds to the foreground app.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: Step,
    pub outcome: Outcome,
}

impl StepReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_record_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validator.pid");

        let record = PidRecord {
            pid: 4242,
            rpc_url: "http://127.0.0.1:8899".to_string(),
            started_at: Utc::now(),
        };
        record.write(&path).unwrap();

        let loaded = PidRecord::load(&path).expect("record loads");
        assert_eq!(loaded.pid, 4242);
        assert_eq!(loaded.rpc_url, "http://127.0.0.1:8899");
    }

    #[test]
    fn pid_record_load_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validator.pid");

        assert!(PidRecord::load(&path).is_none());
        std::fs::write(&path, "not json").unwrap();
        assert!(PidRecord::load(&path).is_none());
    }

    #[test]
    fn readiness_state_display() {
        assert_eq!(ReadinessState::NotStarted.to_string(), "not-started");
        assert_eq!(ReadinessState::Polling.to_string(), "polling");
        assert_eq!(ReadinessState::Ready.to_string(), "ready");
    }

    #[test]
    fn step_report_succeeded() {
        let ok = StepReport {
            step: Step::Fund,
            outcome: Outcome::Ok,
        };
        let failed = StepReport {
            step: Step::BuildDeploy,
            outcome: Outcome::Failed("faucet dry".to_string()),
        };
        assert!(ok.succeeded());
        assert!(!failed.succeeded());
    }
}
