use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use steward_election::{ElectionEngine, ElectionError};
use steward_lease::{LeaseKey, LeaseStore};

use crate::config::StewardConfig;
use crate::handler::LoggingHandler;

/// Build one engine per configured election.
pub fn build_engines(
    config: &StewardConfig,
    store: &Arc<dyn LeaseStore>,
) -> Result<Vec<ElectionEngine>, ElectionError> {
    config
        .elections
        .iter()
        .map(|entry| {
            ElectionEngine::builder()
                .config(entry.to_election_config())
                .store(Arc::clone(store))
                .handler(Arc::new(LoggingHandler::new(entry.key.as_str())))
                .build()
        })
        .collect()
}

/// Start every engine, wait for `shutdown`, then stop every engine once.
///
/// Stopping is bounded by the configured shutdown timeout; engines that
/// have not finished by then are left to expire through their TTL.
pub async fn run_until<F>(config: &StewardConfig, engines: &[ElectionEngine], shutdown: F)
where
    F: Future<Output = ()>,
{
    for engine in engines {
        engine.start().await;
        info!(
            key = %engine.key(),
            leader = engine.is_leader(),
            "joined election"
        );
    }

    shutdown.await;
    info!(engines = engines.len(), "shutting down, releasing leases");

    let stop_all = join_all(engines.iter().map(ElectionEngine::stop));
    if tokio::time::timeout(config.shutdown_timeout(), stop_all)
        .await
        .is_err()
    {
        warn!(
            timeout_ms = config.shutdown_timeout_ms,
            "shutdown timed out; remaining leases will expire on their own"
        );
    }

    for engine in engines {
        let snapshot = engine.metrics();
        info!(key = %engine.key(), ?snapshot, "election stopped");
    }
}

/// Write the current holder of every configured key to `out`.
pub async fn write_status<W: Write>(
    config: &StewardConfig,
    store: &dyn LeaseStore,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    for entry in &config.elections {
        let key = LeaseKey::new(entry.key.as_str());
        match store.holder(&key).await? {
            Some(token) => writeln!(out, "{key}\t{token}")?,
            None => writeln!(out, "{key}\t-")?,
        }
    }
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
