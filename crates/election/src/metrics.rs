use std::sync::atomic::{AtomicU64, Ordering};

use steward_lease::LeaseOperation;

use crate::observer::{AttemptResult, TickOutcome, Transition};

/// Atomic counters tracking election outcomes for one engine.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct ElectionMetrics {
    /// Ticks that ran to completion.
    pub ticks: AtomicU64,
    /// Ticks skipped because another tick was still in flight.
    pub skipped_ticks: AtomicU64,
    /// Promotions to leader.
    pub acquisitions: AtomicU64,
    /// Acquire attempts rejected because another token holds the lease.
    pub contended: AtomicU64,
    /// Successful lease extensions.
    pub renewals: AtomicU64,
    /// Leader to follower transitions, including aborted promotions.
    pub demotions: AtomicU64,
    /// Leases handed back with a successful compare-and-delete. Counted by
    /// the engine at the release itself, since aborted promotions release
    /// inside an acquire tick.
    pub releases: AtomicU64,
    /// Store operations that failed to reach the store.
    pub store_errors: AtomicU64,
    /// `on_leader` / `on_follower` failures.
    pub callback_failures: AtomicU64,
}

impl ElectionMetrics {
    /// Increment the skipped-tick counter.
    pub fn increment_skipped(&self) {
        self.skipped_ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the successful-release counter.
    pub fn increment_releases(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one tick outcome into the counters.
    pub fn record(&self, outcome: &TickOutcome) {
        if outcome.operation != LeaseOperation::Release {
            self.ticks.fetch_add(1, Ordering::Relaxed);
        }

        match (&outcome.result, outcome.operation) {
            (AttemptResult::StoreUnavailable(_), _) => {
                self.store_errors.fetch_add(1, Ordering::Relaxed);
            }
            (AttemptResult::Rejected, LeaseOperation::Acquire) => {
                self.contended.fetch_add(1, Ordering::Relaxed);
            }
            (AttemptResult::Succeeded, LeaseOperation::Extend) => {
                self.renewals.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        match outcome.transition {
            Some(Transition::Promoted) => {
                self.acquisitions.fetch_add(1, Ordering::Relaxed);
            }
            Some(Transition::PromotionAborted | Transition::Demoted) => {
                self.demotions.fetch_add(1, Ordering::Relaxed);
            }
            None => {}
        }

        self.callback_failures
            .fetch_add(outcome.callback_failures.len() as u64, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            skipped_ticks: self.skipped_ticks.load(Ordering::Relaxed),
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
            renewals: self.renewals.load(Ordering::Relaxed),
            demotions: self.demotions.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`ElectionMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub skipped_ticks: u64,
    pub acquisitions: u64,
    pub contended: u64,
    pub renewals: u64,
    pub demotions: u64,
    pub releases: u64,
    pub store_errors: u64,
    pub callback_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(
        operation: LeaseOperation,
        result: AttemptResult,
        transition: Option<Transition>,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::new(operation, result);
        outcome.transition = transition;
        outcome
    }

    #[test]
    fn snapshot_starts_at_zero() {
        assert_eq!(
            ElectionMetrics::default().snapshot(),
            MetricsSnapshot::default()
        );
    }

    #[test]
    fn records_a_leadership_cycle() {
        let m = ElectionMetrics::default();
        m.record(&outcome(
            LeaseOperation::Acquire,
            AttemptResult::Rejected,
            None,
        ));
        m.record(&outcome(
            LeaseOperation::Acquire,
            AttemptResult::Succeeded,
            Some(Transition::Promoted),
        ));
        m.record(&outcome(
            LeaseOperation::Extend,
            AttemptResult::Succeeded,
            None,
        ));
        m.record(&outcome(
            LeaseOperation::Extend,
            AttemptResult::StoreUnavailable("down".into()),
            Some(Transition::Demoted),
        ));
        m.increment_skipped();

        let snap = m.snapshot();
        assert_eq!(snap.ticks, 4);
        assert_eq!(snap.contended, 1);
        assert_eq!(snap.acquisitions, 1);
        assert_eq!(snap.renewals, 1);
        assert_eq!(snap.store_errors, 1);
        assert_eq!(snap.demotions, 1);
        assert_eq!(snap.skipped_ticks, 1);
        assert_eq!(snap.releases, 0);
    }

    #[test]
    fn release_is_not_a_tick() {
        let m = ElectionMetrics::default();
        let mut stop = outcome(
            LeaseOperation::Release,
            AttemptResult::Succeeded,
            Some(Transition::Demoted),
        );
        stop.callback_failures.push("on_follower callback failed: boom".into());
        m.record(&stop);

        let snap = m.snapshot();
        assert_eq!(snap.ticks, 0);
        assert_eq!(snap.releases, 0, "releases are counted where they happen");
        assert_eq!(snap.demotions, 1);
        assert_eq!(snap.callback_failures, 1);
    }
}
