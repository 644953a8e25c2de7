//! The election engine: one tick loop per contested key.
//!
//! Each tick is a single attempt: a follower tries `set_if_absent`, a leader
//! tries `compare_and_extend`. Any store failure counts as "did not
//! succeed", so a leader that cannot prove it still holds the lease demotes
//! itself instead of assuming it does.
//!
//! Belief in leadership is bounded by the lease itself: every successful
//! acquire or extend records a local deadline of `attempt start + ttl`,
//! which can only be earlier than the expiry the store computed. Renewals
//! are capped at the time left before that deadline, and
//! [`ElectionEngine::is_leader`] turns false once it passes, so this
//! instance stops claiming the lease before any other can take it.
//!
//! Ticks never overlap. The leadership state sits behind an async mutex that
//! a tick takes with `try_lock`; a tick that finds it busy is skipped rather
//! than queued, and the next one picks up the current state.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use steward_lease::{LeaseError, LeaseKey, LeaseOperation, LeaseStore};

use crate::config::{ElectionConfig, ResolvedConfig, duration_ms};
use crate::error::ElectionError;
use crate::handler::{LeadershipHandler, NoopHandler};
use crate::metrics::{ElectionMetrics, MetricsSnapshot};
use crate::observer::{AttemptResult, ElectionObserver, TickOutcome, TracingObserver, Transition};

/// Leadership state owned by the tick that holds the lock.
#[derive(Debug, Default)]
struct ElectionState {
    leader: bool,
}

/// State shared between the engine handle and its tick loop task.
struct Shared {
    config: ResolvedConfig,
    store: Arc<dyn LeaseStore>,
    handler: Arc<dyn LeadershipHandler>,
    observer: Arc<dyn ElectionObserver>,
    metrics: Arc<ElectionMetrics>,
    state: tokio::sync::Mutex<ElectionState>,
    leader_tx: watch::Sender<bool>,
    leader_until: Mutex<Option<Instant>>,
    started: AtomicBool,
    stopped: AtomicBool,
    cancel: CancellationToken,
}

/// Lease-based leader election for one key.
///
/// Build one with [`ElectionEngine::builder`], call [`start`](Self::start)
/// once the handler is ready, and [`stop`](Self::stop) on shutdown. The
/// engine never installs signal handlers; the host wires its own signal
/// handling to `stop()`.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use std::time::Duration;
/// use steward_election::{ElectionConfig, ElectionEngine};
///
/// let engine = ElectionEngine::builder()
///     .config(ElectionConfig::new("leader:job-sweeper", Duration::from_secs(15)))
///     .store(Arc::new(store))
///     .handler(Arc::new(sweeper))
///     .build()?;
///
/// engine.start().await;
/// // ...
/// engine.stop().await;
/// ```
pub struct ElectionEngine {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ElectionEngine {
    /// Create a builder for an election engine.
    pub fn builder() -> ElectionEngineBuilder {
        ElectionEngineBuilder::new()
    }

    /// Begin participating in the election.
    ///
    /// Runs the first tick before returning, so [`is_leader`](Self::is_leader)
    /// is meaningful as soon as this resolves, then keeps ticking in the
    /// background. Calling it again, or after [`stop`](Self::stop), does
    /// nothing.
    pub async fn start(&self) {
        let shared = &self.shared;
        if shared.stopped.load(Ordering::SeqCst) {
            warn!(key = %shared.config.key, "election engine already stopped, not starting");
            return;
        }
        if shared.started.swap(true, Ordering::SeqCst) {
            return;
        }

        info!(
            key = %shared.config.key,
            token = %shared.config.token,
            ttl_ms = duration_ms(shared.config.ttl),
            tick_interval_ms = duration_ms(shared.config.tick_interval),
            "starting leader election"
        );

        let (ready_tx, ready_rx) = oneshot::channel();
        let handle = tokio::spawn(Arc::clone(shared).run(ready_tx));
        *self.task.lock() = Some(handle);

        // Dropped without a value if stop() cancels the loop first.
        let _ = ready_rx.await;
    }

    /// Stop participating in the election.
    ///
    /// Cancels the tick loop and, if this instance is leader, releases the
    /// lease (bounded by the operation timeout; a failure is logged and the
    /// lease is left to expire) and fires `on_follower`. Idempotent.
    ///
    /// A tick in flight is given one operation timeout to finish. The
    /// background loop is aborted after that, which drops any callback it
    /// was awaiting. A tick driven through [`tick`](Self::tick) cannot be
    /// aborted; if it is still running when `stop()` gives up on it, that
    /// tick hands the lease back and fires `on_follower` itself when it
    /// completes, instead of leaving a promotion behind. Apart from that
    /// tick, the engine makes no store calls or callbacks once this returns.
    pub async fn stop(&self) {
        let shared = &self.shared;
        if shared.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        shared.cancel.cancel();

        let timeout = shared.config.operation_timeout;
        let handle = self.task.lock().take();
        if let Some(mut handle) = handle {
            if tokio::time::timeout(timeout, &mut handle).await.is_err() {
                warn!(
                    key = %shared.config.key,
                    timeout_ms = duration_ms(timeout),
                    "election tick still running at shutdown, aborting it"
                );
                handle.abort();
                let _ = handle.await;
            }
        }

        // A tick driven through `tick()` may still hold the state.
        let Ok(mut state) = tokio::time::timeout(timeout, shared.state.lock()).await else {
            warn!(
                key = %shared.config.key,
                "manually driven tick still running at shutdown; it will hand back any lease it takes"
            );
            return;
        };

        if state.leader {
            let started = Instant::now();
            shared.demote(&mut state);
            let result = shared.release().await;

            let mut outcome = TickOutcome::new(LeaseOperation::Release, AttemptResult::from(&result));
            outcome.transition = Some(Transition::Demoted);
            shared.notify_follower(&mut outcome).await;
            outcome.latency = started.elapsed();
            shared.report(&outcome);
        }

        info!(
            key = %shared.config.key,
            token = %shared.config.token,
            "leader election stopped"
        );
    }

    /// Run one acquire-or-extend attempt now.
    ///
    /// Returns `None` if the engine is stopped or another tick is in
    /// flight. Hosts normally let [`start`](Self::start) drive ticks; this
    /// is for hosts with their own scheduler and for tests.
    pub async fn tick(&self) -> Option<TickOutcome> {
        self.shared.tick().await
    }

    /// Whether this instance is leader: the most recent completed tick
    /// left it holding the lease and the lease's local deadline has not
    /// passed since.
    pub fn is_leader(&self) -> bool {
        self.shared.is_leader()
    }

    /// This instance's token, for log correlation.
    pub fn leader_id(&self) -> &str {
        self.shared.config.token.as_str()
    }

    /// The contested lease key.
    pub fn key(&self) -> &LeaseKey {
        &self.shared.config.key
    }

    /// The interval between background ticks.
    pub fn tick_interval(&self) -> Duration {
        self.shared.config.tick_interval
    }

    /// Watch leadership changes as ticks publish them. Unlike
    /// [`is_leader`](Self::is_leader) the value only changes when a tick or
    /// `stop()` completes, so a lapsed lease shows up here at the end of the
    /// renewal that discovered it.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shared.leader_tx.subscribe()
    }

    /// Snapshot of this engine's counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl Drop for ElectionEngine {
    fn drop(&mut self) {
        // Without stop() the lease is not released; it expires after its TTL.
        self.shared.cancel.cancel();
    }
}

impl Shared {
    async fn run(self: Arc<Self>, ready_tx: oneshot::Sender<()>) {
        let mut ready_tx = Some(ready_tx);
        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                    if let Some(tx) = ready_tx.take() {
                        let _ = tx.send(());
                    }
                }
            }
        }

        debug!(key = %self.config.key, "election tick loop exited");
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    async fn tick(&self) -> Option<TickOutcome> {
        if self.is_stopped() {
            return None;
        }
        let Ok(mut state) = self.state.try_lock() else {
            self.metrics.increment_skipped();
            debug!(key = %self.config.key, "previous election tick still in flight, skipping");
            return None;
        };
        if self.is_stopped() {
            return None;
        }

        let started = Instant::now();
        let mut outcome = if state.leader {
            self.renew(&mut state).await
        } else {
            self.campaign(&mut state).await
        };
        if state.leader && self.is_stopped() {
            // stop() gave up waiting for this tick; finish the hand-off here.
            self.demote(&mut state);
            let _ = self.release().await;
            outcome.transition = Some(Transition::Demoted);
            self.notify_follower(&mut outcome).await;
        }
        outcome.leader = state.leader;
        outcome.latency = started.elapsed();
        self.report(&outcome);
        Some(outcome)
    }

    /// Follower tick: try to take the lease.
    async fn campaign(&self, state: &mut ElectionState) -> TickOutcome {
        let attempt_start = Instant::now();
        let result = self
            .store_call(
                LeaseOperation::Acquire,
                self.config.operation_timeout,
                self.store
                    .set_if_absent(&self.config.key, &self.config.token, self.config.ttl),
            )
            .await;
        let mut outcome = TickOutcome::new(LeaseOperation::Acquire, AttemptResult::from(&result));
        if !outcome.result.succeeded() {
            return outcome;
        }

        if self.is_stopped() {
            // stop() arrived during the acquire; never promote.
            let _ = self.release().await;
            return outcome;
        }

        // Leadership is published only once on_leader has succeeded.
        match self.handler.on_leader().await {
            Ok(()) if self.is_stopped() => {
                let _ = self.release().await;
                outcome.transition = Some(Transition::PromotionAborted);
                self.notify_follower(&mut outcome).await;
            }
            Ok(()) => {
                self.promote(state, attempt_start + self.config.ttl);
                outcome.transition = Some(Transition::Promoted);
            }
            Err(source) => {
                outcome.callback_failures.push(
                    ElectionError::Callback {
                        callback: "on_leader",
                        source,
                    }
                    .to_string(),
                );
                let _ = self.release().await;
                outcome.transition = Some(Transition::PromotionAborted);
                self.notify_follower(&mut outcome).await;
            }
        }
        outcome
    }

    /// Leader tick: keep the lease or step down.
    async fn renew(&self, state: &mut ElectionState) -> TickOutcome {
        let attempt_start = Instant::now();
        let remaining = self.lease_remaining(attempt_start);
        let mut outcome = if remaining.is_zero() {
            TickOutcome::new(LeaseOperation::Extend, AttemptResult::Lapsed)
        } else {
            let result = self
                .store_call(
                    LeaseOperation::Extend,
                    self.config.operation_timeout.min(remaining),
                    self.store
                        .compare_and_extend(&self.config.key, &self.config.token, self.config.ttl),
                )
                .await;
            TickOutcome::new(LeaseOperation::Extend, AttemptResult::from(&result))
        };

        if outcome.result.succeeded() {
            *self.leader_until.lock() = Some(attempt_start + self.config.ttl);
            return outcome;
        }

        // Rejected means another token holds the key now; unavailable or
        // lapsed means we cannot prove we still hold it. Either way we are
        // not leader.
        self.demote(state);
        outcome.transition = Some(Transition::Demoted);
        self.notify_follower(&mut outcome).await;
        outcome
    }

    /// Best-effort compare-and-delete of our own lease.
    async fn release(&self) -> Result<bool, ElectionError> {
        let result = self
            .store_call(
                LeaseOperation::Release,
                self.config.operation_timeout,
                self.store
                    .compare_and_delete(&self.config.key, &self.config.token),
            )
            .await;
        match &result {
            Ok(true) => self.metrics.increment_releases(),
            Ok(false) => {
                debug!(key = %self.config.key, "lease already gone at release");
            }
            Err(e) => {
                warn!(
                    key = %self.config.key,
                    token = %self.config.token,
                    error = %e,
                    "failed to release lease, it will expire after its TTL"
                );
            }
        }
        result
    }

    async fn store_call<F>(
        &self,
        operation: LeaseOperation,
        timeout: Duration,
        call: F,
    ) -> Result<bool, ElectionError>
    where
        F: Future<Output = Result<bool, LeaseError>>,
    {
        tokio::time::timeout(timeout, call)
            .await
            .unwrap_or(Err(LeaseError::Timeout(timeout)))
            .map_err(|source| ElectionError::StoreUnavailable {
                operation,
                key: self.config.key.clone(),
                source,
            })
    }

    /// Fire `on_follower`, recording a failure on the outcome.
    async fn notify_follower(&self, outcome: &mut TickOutcome) {
        if let Err(source) = self.handler.on_follower().await {
            outcome.callback_failures.push(
                ElectionError::Callback {
                    callback: "on_follower",
                    source,
                }
                .to_string(),
            );
        }
    }

    fn is_leader(&self) -> bool {
        self.leader_until
            .lock()
            .is_some_and(|deadline| Instant::now() < deadline)
    }

    /// Time left before the lease may have expired in the store.
    fn lease_remaining(&self, now: Instant) -> Duration {
        self.leader_until
            .lock()
            .map_or(Duration::ZERO, |deadline| deadline.saturating_duration_since(now))
    }

    fn promote(&self, state: &mut ElectionState, deadline: Instant) {
        state.leader = true;
        *self.leader_until.lock() = Some(deadline);
        self.leader_tx.send_replace(true);
    }

    /// Must run before the lease is released, so no other instance can
    /// acquire it while this one still claims it.
    fn demote(&self, state: &mut ElectionState) {
        state.leader = false;
        *self.leader_until.lock() = None;
        self.leader_tx.send_replace(false);
    }

    fn report(&self, outcome: &TickOutcome) {
        self.metrics.record(outcome);
        self.observer
            .observe(&self.config.key, &self.config.token, outcome);
    }
}

/// Builder for an [`ElectionEngine`].
pub struct ElectionEngineBuilder {
    config: Option<ElectionConfig>,
    store: Option<Arc<dyn LeaseStore>>,
    handler: Option<Arc<dyn LeadershipHandler>>,
    observer: Option<Arc<dyn ElectionObserver>>,
    metrics: Option<Arc<ElectionMetrics>>,
}

impl ElectionEngineBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: None,
            store: None,
            handler: None,
            observer: None,
            metrics: None,
        }
    }

    /// Set the election configuration (required).
    #[must_use]
    pub fn config(mut self, config: ElectionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the lease store (required).
    #[must_use]
    pub fn store(mut self, store: Arc<dyn LeaseStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the leadership handler. Defaults to [`NoopHandler`].
    #[must_use]
    pub fn handler(mut self, handler: Arc<dyn LeadershipHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Set the tick observer. Defaults to [`TracingObserver`].
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn ElectionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Share a metrics instance, e.g. to aggregate several engines.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<ElectionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the engine. It does nothing until [`ElectionEngine::start`].
    ///
    /// # Errors
    ///
    /// Returns [`ElectionError::Configuration`] if the configuration or the
    /// store is missing, or the configuration is invalid.
    pub fn build(self) -> Result<ElectionEngine, ElectionError> {
        let config = self
            .config
            .ok_or_else(|| ElectionError::Configuration("missing lease key and TTL".to_owned()))?
            .resolve()?;
        let store = self
            .store
            .ok_or_else(|| ElectionError::Configuration(format!("missing lease store for {}", config.key)))?;

        let (leader_tx, _) = watch::channel(false);
        let shared = Shared {
            config,
            store,
            handler: self.handler.unwrap_or_else(|| Arc::new(NoopHandler)),
            observer: self.observer.unwrap_or_else(|| Arc::new(TracingObserver)),
            metrics: self.metrics.unwrap_or_default(),
            state: tokio::sync::Mutex::new(ElectionState::default()),
            leader_tx,
            leader_until: Mutex::new(None),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        };

        Ok(ElectionEngine {
            shared: Arc::new(shared),
            task: Mutex::new(None),
        })
    }
}

impl Default for ElectionEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ElectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElectionEngine")
            .field("key", &self.shared.config.key)
            .field("token", &self.shared.config.token)
            .field("leader", &self.is_leader())
            .field("stopped", &self.shared.is_stopped())
            .finish_non_exhaustive()
    }
}
