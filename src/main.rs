//! chainup — local ledger dev-loop orchestrator
//!
//! Usage:
//!   chainup up -- python app.py     → validator + provision + app
//!   chainup status                  → probe the environment, change nothing
//!   chainup down                    → stop a leftover validator

use std::path::PathBuf;

use chainup::config::{expand_tilde, Config};
use chainup::localnet;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "chainup",
    about = "Boot a local validator, provision a dev identity, run the app, clean up on exit",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Validator RPC endpoint (or set SOLANA_RPC_URL)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Identity keypair path (or set SOLANA_KEYPAIR_PATH)
    #[arg(long, global = true)]
    keypair: Option<String>,

    /// Ledger state directory
    #[arg(long, global = true, default_value = "test-ledger")]
    ledger_dir: PathBuf,

    /// Anchor workspace directory for build/deploy
    #[arg(long, global = true, default_value = ".")]
    program_dir: PathBuf,

    /// Airdrop amount in SOL for a freshly created identity
    #[arg(long, global = true, default_value_t = 2)]
    airdrop_sol: u64,

    /// Milliseconds between readiness checks
    #[arg(long, global = true, default_value_t = 2000)]
    poll_interval_ms: u64,

    /// Readiness checks before giving up
    #[arg(long, global = true, default_value_t = 60)]
    max_attempts: u32,

    /// Validator binary
    #[arg(long, global = true, default_value = "solana-test-validator")]
    validator_bin: String,

    /// Keypair generation binary
    #[arg(long, global = true, default_value = "solana-keygen")]
    keygen_bin: String,

    /// Solana CLI binary (airdrop step)
    #[arg(long, global = true, default_value = "solana")]
    solana_bin: String,

    /// Anchor binary (build/deploy step)
    #[arg(long, global = true, default_value = "anchor")]
    anchor_bin: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the environment up and run the foreground app
    Up {
        /// Foreground application command (after `--`)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        app: Vec<String>,
    },
    /// Report validator and identity state without changing anything
    Status,
    /// Stop a validator left over from a previous session
    Down,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = resolve_config(&cli);

    match cli.command {
        Commands::Up { ref app } => {
            if !app.is_empty() {
                config.app_command = app.clone();
            }
            let code = localnet::run(config).await?;
            std::process::exit(code);
        }
        Commands::Status => {
            localnet::status(&config).await?;
        }
        Commands::Down => {
            localnet::down(&config).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chainup=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn resolve_config(cli: &Cli) -> Config {
    let mut config = Config::default();

    config.rpc_url = cli
        .rpc_url
        .clone()
        .or_else(|| std::env::var("SOLANA_RPC_URL").ok())
        .unwrap_or(config.rpc_url);

    config.keypair_path = cli
        .keypair
        .as_deref()
        .map(expand_tilde)
        .or_else(|| std::env::var("SOLANA_KEYPAIR_PATH").ok().map(PathBuf::from))
        .unwrap_or(config.keypair_path);

    config.ledger_dir = cli.ledger_dir.clone();
    config.program_dir = cli.program_dir.clone();
    config.airdrop_sol = cli.airdrop_sol;
    config.poll_interval = std::time::Duration::from_millis(cli.poll_interval_ms);
    config.max_attempts = cli.max_attempts;
    config.validator_bin = cli.validator_bin.clone();
    config.keygen_bin = cli.keygen_bin.clone();
    config.solana_bin = cli.solana_bin.clone();
    config.anchor_bin = cli.anchor_bin.clone();

    config
}
