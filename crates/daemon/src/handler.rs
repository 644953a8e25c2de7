use async_trait::async_trait;
use tracing::info;

use steward_election::{HandlerError, LeadershipHandler};
use steward_lease::LeaseKey;

/// Handler used by the standalone daemon. It holds leadership on behalf of
/// external processes that poll `steward status`, so the transitions are
/// only logged.
#[derive(Debug, Clone)]
pub struct LoggingHandler {
    key: LeaseKey,
}

impl LoggingHandler {
    pub fn new(key: impl Into<LeaseKey>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl LeadershipHandler for LoggingHandler {
    async fn on_leader(&self) -> Result<(), HandlerError> {
        info!(key = %self.key, "now leading");
        Ok(())
    }

    async fn on_follower(&self) -> Result<(), HandlerError> {
        info!(key = %self.key, "no longer leading");
        Ok(())
    }
}
