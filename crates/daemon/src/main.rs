use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use steward_daemon::config::StewardConfig;
use steward_daemon::runner::{build_engines, run_until, shutdown_signal, write_status};
use steward_lease::LeaseStore;
use steward_lease_redis::RedisLeaseStore;

#[derive(Parser, Debug)]
#[command(name = "steward", about = "Lease-based leader election on Redis")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "steward.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Take part in every configured election until SIGINT or SIGTERM.
    Run,
    /// Print the current holder of every configured key and exit.
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = StewardConfig::load(&cli.config)?;
    let store: Arc<dyn LeaseStore> = Arc::new(RedisLeaseStore::new(&config.redis)?);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            if config.elections.is_empty() {
                warn!(config = %cli.config, "no elections configured, nothing to do");
                return Ok(());
            }
            let engines = build_engines(&config, &store)?;
            info!(elections = engines.len(), "steward starting");
            run_until(&config, &engines, shutdown_signal()).await;
            info!("steward stopped");
        }
        Command::Status => {
            let mut stdout = std::io::stdout().lock();
            write_status(&config, store.as_ref(), &mut stdout).await?;
        }
    }

    Ok(())
}
