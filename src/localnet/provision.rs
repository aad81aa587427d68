//! First-run provisioning: fund the identity, build and publish the program.
//!
//! Both steps are best-effort by policy. A dry faucet or a broken build is
//! reported and logged, and the dev loop still reaches the app — fail soft,
//! inspect later.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use super::types::{IdentityRecord, Outcome, Step, StepReport};
use crate::config::Config;

const STDERR_TAIL: usize = 400;

/// Run the fund and build/deploy steps strictly in order, collecting a
/// report per step. Never fails: failures land in the report.
pub async fn fund_and_publish(config: &Config, identity: &IdentityRecord) -> Vec<StepReport> {
    let report = vec![fund(config, identity).await, build_deploy(config, identity).await];

    for step in &report {
        match &step.outcome {
            Outcome::Ok => info!(step = %step.step, "provisioning step succeeded"),
            Outcome::Failed(reason) => {
                warn!(step = %step.step, %reason, "provisioning step failed, continuing")
            }
        }
    }

    report
}

async fn fund(config: &Config, identity: &IdentityRecord) -> StepReport {
    let amount = config.airdrop_sol.to_string();
    let outcome = run_step(
        &config.solana_bin,
        [
            OsStr::new("airdrop"),
            OsStr::new(&amount),
            OsStr::new("--keypair"),
            identity.path.as_os_str(),
            OsStr::new("--url"),
            OsStr::new(&config.rpc_url),
        ],
        &config.program_dir,
    )
    .await;

    StepReport {
        step: Step::Fund,
        outcome,
    }
}

async fn build_deploy(config: &Config, identity: &IdentityRecord) -> StepReport {
    let outcome = match run_step(&config.anchor_bin, [OsStr::new("build")], &config.program_dir)
        .await
    {
        Outcome::Ok => {
            run_step(
                &config.anchor_bin,
                [
                    OsStr::new("deploy"),
                    OsStr::new("--provider.cluster"),
                    OsStr::new(&config.rpc_url),
                    OsStr::new("--provider.wallet"),
                    identity.path.as_os_str(),
                ],
                &config.program_dir,
            )
            .await
        }
        failed => failed,
    };

    StepReport {
        step: Step::BuildDeploy,
        outcome,
    }
}

async fn run_step<I>(bin: &str, args: I, cwd: &Path) -> Outcome
where
    I: IntoIterator,
    I::Item: AsRef<OsStr>,
{
    let result = Command::new(bin)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .await;

    match result {
        Ok(output) if output.status.success() => Outcome::Ok,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Outcome::Failed(format!(
                "{bin} exited with {}: {}",
                output.status,
                tail(stderr.trim(), STDERR_TAIL)
            ))
        }
        Err(e) => Outcome::Failed(format!("{bin}: {e}")),
    }
}

/// Last `max` bytes of `s`, on a char boundary.
fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut idx = s.len() - max;
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    &s[idx..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn identity() -> IdentityRecord {
        IdentityRecord {
            path: PathBuf::from("/tmp/id.json"),
            existed: false,
        }
    }

    #[tokio::test]
    async fn run_step_reports_success() {
        let outcome = run_step("true", Vec::<&OsStr>::new(), Path::new(".")).await;
        assert_eq!(outcome, Outcome::Ok);
    }

    #[tokio::test]
    async fn run_step_reports_nonzero_exit() {
        let outcome = run_step("false", Vec::<&OsStr>::new(), Path::new(".")).await;
        assert!(matches!(outcome, Outcome::Failed(_)));
    }

    #[tokio::test]
    async fn run_step_reports_missing_binary() {
        let outcome = run_step(
            "definitely-not-a-real-binary",
            Vec::<&OsStr>::new(),
            Path::new("."),
        )
        .await;
        assert!(matches!(outcome, Outcome::Failed(_)));
    }

    #[tokio::test]
    async fn failures_never_escape_the_report() {
        let mut config = Config::default();
        config.solana_bin = "false".to_string();
        config.anchor_bin = "false".to_string();
        config.program_dir = PathBuf::from(".");

        let report = fund_and_publish(&config, &identity()).await;
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].step, Step::Fund);
        assert_eq!(report[1].step, Step::BuildDeploy);
        assert!(report.iter().all(|r| !r.succeeded()));
    }

    #[test]
    fn tail_respects_char_boundaries() {
        let s = "héllo wörld";
        let t = tail(s, 4);
        assert!(t.len() <= 4);
        assert!(s.ends_with(t));
        assert_eq!(tail("short", 100), "short");
    }
}
