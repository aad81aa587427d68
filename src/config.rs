//! Orchestrator configuration.
//!
//! Everything the dev loop touches is a knob here: which binaries to run,
//! where the ledger and keypair live, how patient the readiness poller is.
//! The CLI layer resolves cli flag → environment variable → default; the
//! test suite points the binary fields at stub scripts.

use std::path::PathBuf;
use std::time::Duration;

/// Default local RPC endpoint (`original_source` dev-loop constant).
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";

/// Default airdrop size in SOL for a freshly created identity.
pub const DEFAULT_AIRDROP_SOL: u64 = 2;

#[derive(Debug, Clone)]
pub struct Config {
    /// Validator binary, spawned detached as the backing service.
    pub validator_bin: String,
    /// Keypair generation tool. The identity file it writes is opaque to us.
    pub keygen_bin: String,
    /// CLI used for the airdrop step.
    pub solana_bin: String,
    /// Build/deploy tool for the on-chain artifact.
    pub anchor_bin: String,

    /// Ledger state directory; also holds `validator.pid` and `validator.log`.
    pub ledger_dir: PathBuf,
    /// RPC endpoint of the validator; `/health` on it is the readiness probe.
    pub rpc_url: String,
    /// Identity keypair path. Presence of the file is the sole existence check.
    pub keypair_path: PathBuf,
    /// Anchor workspace directory for build/deploy.
    pub program_dir: PathBuf,

    /// Airdrop amount in SOL for the first-run fund step.
    pub airdrop_sol: u64,

    /// Fixed sleep between readiness checks.
    pub poll_interval: Duration,
    /// Readiness checks before giving up with a fatal timeout.
    pub max_attempts: u32,

    /// Foreground application command.
    pub app_command: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            validator_bin: "solana-test-validator".to_string(),
            keygen_bin: "solana-keygen".to_string(),
            solana_bin: "solana".to_string(),
            anchor_bin: "anchor".to_string(),
            ledger_dir: PathBuf::from("test-ledger"),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            keypair_path: default_keypair_path(),
            program_dir: PathBuf::from("."),
            airdrop_sol: DEFAULT_AIRDROP_SOL,
            poll_interval: Duration::from_secs(2),
            max_attempts: 60,
            app_command: vec!["python".to_string(), "app.py".to_string()],
        }
    }
}

impl Config {
    /// URL of the validator's health endpoint.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.rpc_url.trim_end_matches('/'))
    }

    /// Path of the persisted pid record used for duplicate detection.
    pub fn pidfile_path(&self) -> PathBuf {
        self.ledger_dir.join("validator.pid")
    }

    /// Path the validator's stdout/stderr are redirected to.
    pub fn validator_log_path(&self) -> PathBuf {
        self.ledger_dir.join("validator.log")
    }
}

/// `~/.config/solana/id.json`, the conventional identity location.
pub fn default_keypair_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config/solana/id.json")
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_url_joins_without_double_slash() {
        let mut config = Config::default();
        config.rpc_url = "http://127.0.0.1:8899/".to_string();
        assert_eq!(config.health_url(), "http://127.0.0.1:8899/health");

        config.rpc_url = "http://127.0.0.1:8899".to_string();
        assert_eq!(config.health_url(), "http://127.0.0.1:8899/health");
    }

    #[test]
    fn pidfile_lives_in_ledger_dir() {
        let mut config = Config::default();
        config.ledger_dir = PathBuf::from("/tmp/ledger");
        assert_eq!(config.pidfile_path(), PathBuf::from("/tmp/ledger/validator.pid"));
        assert_eq!(
            config.validator_log_path(),
            PathBuf::from("/tmp/ledger/validator.log")
        );
    }

    #[test]
    fn expand_tilde_uses_home() {
        std::env::set_var("HOME", "/home/devkit");
        assert_eq!(
            expand_tilde("~/.config/solana/id.json"),
            PathBuf::from("/home/devkit/.config/solana/id.json")
        );
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
    }

    #[test]
    fn defaults_match_dev_loop_constants() {
        let config = Config::default();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.airdrop_sol, 2);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_attempts, 60);
    }
}
