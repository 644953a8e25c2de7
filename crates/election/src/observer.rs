use std::time::Duration;

use steward_lease::{LeaderToken, LeaseKey, LeaseOperation};
use tracing::{debug, info, warn};

use crate::error::ElectionError;

/// What the store said about a single lease operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// The operation took effect.
    Succeeded,
    /// The store answered but the operation did not apply (key held by
    /// another token, or no longer ours).
    Rejected,
    /// The store could not be reached or did not answer in time.
    StoreUnavailable(String),
    /// The lease's local deadline had already passed, so the store was not
    /// asked.
    Lapsed,
}

impl AttemptResult {
    /// Whether the operation took effect.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl From<&Result<bool, ElectionError>> for AttemptResult {
    fn from(result: &Result<bool, ElectionError>) -> Self {
        match result {
            Ok(true) => Self::Succeeded,
            Ok(false) => Self::Rejected,
            Err(e) => Self::StoreUnavailable(e.to_string()),
        }
    }
}

/// A change in leadership caused by a tick or by `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Follower to leader; `on_leader` succeeded.
    Promoted,
    /// Acquired the lease but `on_leader` failed, so it was handed back.
    PromotionAborted,
    /// Leader to follower.
    Demoted,
}

/// Outcome of one election tick (or of the release performed by `stop()`).
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// Which store operation was attempted.
    pub operation: LeaseOperation,
    /// What the store answered.
    pub result: AttemptResult,
    /// Leadership change caused by this tick, if any.
    pub transition: Option<Transition>,
    /// Leadership belief after the tick.
    pub leader: bool,
    /// Callback failures raised during the tick.
    pub callback_failures: Vec<String>,
    /// Wall time spent in the tick, callbacks included.
    pub latency: Duration,
}

impl TickOutcome {
    pub(crate) fn new(operation: LeaseOperation, result: AttemptResult) -> Self {
        Self {
            operation,
            result,
            transition: None,
            leader: false,
            callback_failures: Vec::new(),
            latency: Duration::ZERO,
        }
    }
}

/// Consumer of per-tick election outcomes.
///
/// Called synchronously at the end of every tick; implementations must not
/// block.
pub trait ElectionObserver: Send + Sync {
    fn observe(&self, key: &LeaseKey, token: &LeaderToken, outcome: &TickOutcome);
}

/// Default observer: one `tracing` event per tick.
///
/// Transitions log at `info`, store or callback failures at `warn`, and
/// steady-state ticks at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ElectionObserver for TracingObserver {
    fn observe(&self, key: &LeaseKey, token: &LeaderToken, outcome: &TickOutcome) {
        #[allow(clippy::cast_possible_truncation)]
        let latency_ms = outcome.latency.as_millis() as u64;
        let operation = outcome.operation.as_str();

        if let AttemptResult::StoreUnavailable(error) = &outcome.result {
            warn!(
                %key,
                %token,
                operation,
                transition = ?outcome.transition,
                leader = outcome.leader,
                latency_ms,
                error = %error,
                "lease store unavailable, treating operation as failed"
            );
        }

        if outcome.result == AttemptResult::Lapsed {
            warn!(
                %key,
                %token,
                operation,
                "lease deadline passed before it could be renewed"
            );
        }

        for failure in &outcome.callback_failures {
            warn!(%key, %token, operation, error = %failure, "leadership callback failed");
        }

        match outcome.transition {
            Some(Transition::Promoted) => {
                info!(%key, %token, latency_ms, "became leader");
            }
            Some(Transition::PromotionAborted) => {
                info!(%key, %token, latency_ms, "leader duties failed to start, lease handed back");
            }
            Some(Transition::Demoted) => {
                info!(%key, %token, operation, latency_ms, "no longer leader");
            }
            None => {
                debug!(
                    %key,
                    %token,
                    operation,
                    result = ?outcome.result,
                    leader = outcome.leader,
                    latency_ms,
                    "election tick"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use steward_lease::LeaseError;

    use super::*;

    #[test]
    fn attempt_result_from_store_answer() {
        let acquired: Result<bool, ElectionError> = Ok(true);
        let held: Result<bool, ElectionError> = Ok(false);
        assert_eq!(AttemptResult::from(&acquired), AttemptResult::Succeeded);
        assert_eq!(AttemptResult::from(&held), AttemptResult::Rejected);

        let err: Result<bool, ElectionError> = Err(ElectionError::StoreUnavailable {
            operation: LeaseOperation::Extend,
            key: LeaseKey::new("leader:sweeper"),
            source: LeaseError::Connection("refused".into()),
        });
        match AttemptResult::from(&err) {
            AttemptResult::StoreUnavailable(msg) => {
                assert!(msg.contains("extend"));
                assert!(msg.contains("leader:sweeper"));
                assert!(msg.contains("refused"));
            }
            other => panic!("expected StoreUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn tracing_observer_handles_every_shape() {
        let key = LeaseKey::new("leader:sweeper");
        let token = LeaderToken::generate();
        let mut outcome = TickOutcome::new(LeaseOperation::Acquire, AttemptResult::Succeeded);
        for transition in [
            None,
            Some(Transition::Promoted),
            Some(Transition::PromotionAborted),
            Some(Transition::Demoted),
        ] {
            outcome.transition = transition;
            TracingObserver.observe(&key, &token, &outcome);
        }
        outcome.result = AttemptResult::StoreUnavailable("down".into());
        outcome.callback_failures.push("boom".into());
        TracingObserver.observe(&key, &token, &outcome);

        let mut lapsed = TickOutcome::new(LeaseOperation::Extend, AttemptResult::Lapsed);
        lapsed.transition = Some(Transition::Demoted);
        assert!(!lapsed.result.succeeded());
        TracingObserver.observe(&key, &token, &lapsed);
    }
}
