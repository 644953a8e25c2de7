use async_trait::async_trait;

use crate::error::HandlerError;

/// Business logic driven by leadership transitions.
///
/// Both methods run inside the election tick, so the next tick does not
/// start until they return. Start long-running leader work on a separate
/// task and stop it from [`on_follower`](Self::on_follower).
///
/// Returning an error from [`on_leader`](Self::on_leader) gives the lease
/// back straight away and fires [`on_follower`](Self::on_follower), so a
/// node that cannot do the work never blocks others from doing it.
#[async_trait]
pub trait LeadershipHandler: Send + Sync {
    /// Called once when this instance becomes leader.
    async fn on_leader(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Called once when this instance stops being leader. Never called for
    /// an instance that was never leader.
    async fn on_follower(&self) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// A handler that does nothing; useful when callers only poll
/// [`is_leader`](crate::ElectionEngine::is_leader).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl LeadershipHandler for NoopHandler {}
