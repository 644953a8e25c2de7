use std::time::Duration;

use steward_lease::{LeaderToken, LeaseKey};
use tracing::warn;

use crate::error::ElectionError;

/// Shortest tick interval the derived default will pick.
pub const MIN_DERIVED_TICK: Duration = Duration::from_secs(1);

/// Longest tick interval the derived default will pick.
pub const MAX_DERIVED_TICK: Duration = Duration::from_secs(10);

/// The derived tick interval is `ttl / DERIVED_TICK_DIVISOR`, clamped to
/// [`MIN_DERIVED_TICK`, `MAX_DERIVED_TICK`]. With a divisor of 3 a leader
/// can miss two consecutive renewals before its lease lapses.
pub const DERIVED_TICK_DIVISOR: u32 = 3;

/// Configuration for one [`ElectionEngine`](crate::ElectionEngine).
///
/// Only the key and the TTL are required; everything else has a default
/// resolved when the engine is built.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use steward_election::ElectionConfig;
///
/// let config = ElectionConfig::new("leader:job-sweeper", Duration::from_secs(15))
///     .with_tick_interval(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ElectionConfig {
    /// The contested lease key.
    pub key: LeaseKey,
    /// Lease lifetime granted by every acquire and extend.
    pub ttl: Duration,
    /// Time between ticks. Defaults to a fraction of the TTL.
    pub tick_interval: Option<Duration>,
    /// Bound on each store call and on how long `stop()` waits for an
    /// in-flight tick. Defaults to the tick interval.
    pub operation_timeout: Option<Duration>,
    /// Identity of this instance. Defaults to a fresh random token.
    pub token: Option<LeaderToken>,
}

impl ElectionConfig {
    /// Create a configuration with the required options.
    pub fn new(key: impl Into<LeaseKey>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            ttl,
            tick_interval: None,
            operation_timeout: None,
            token: None,
        }
    }

    /// Set the tick interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Set the store operation timeout.
    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Use a fixed token instead of a generated one.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(LeaderToken::new(token));
        self
    }

    /// Validate the configuration and fill in defaults.
    pub(crate) fn resolve(self) -> Result<ResolvedConfig, ElectionError> {
        if self.key.is_blank() {
            return Err(ElectionError::Configuration(
                "lease key must not be empty".to_owned(),
            ));
        }
        if self.ttl.is_zero() {
            return Err(ElectionError::Configuration(format!(
                "lease TTL for {} must be greater than zero",
                self.key
            )));
        }

        let tick_interval = self
            .tick_interval
            .unwrap_or_else(|| derive_tick_interval(self.ttl));
        if tick_interval.is_zero() {
            return Err(ElectionError::Configuration(format!(
                "tick interval for {} must be greater than zero",
                self.key
            )));
        }
        if tick_interval >= self.ttl {
            return Err(ElectionError::Configuration(format!(
                "tick interval {tick_interval:?} for {} must be shorter than the lease TTL {:?}",
                self.key, self.ttl
            )));
        }
        if self.ttl < tick_interval * 2 {
            warn!(
                key = %self.key,
                ttl_ms = duration_ms(self.ttl),
                tick_interval_ms = duration_ms(tick_interval),
                "lease TTL is less than twice the tick interval; one late tick can lose the lease"
            );
        }

        let operation_timeout = self.operation_timeout.unwrap_or(tick_interval);
        if operation_timeout.is_zero() {
            return Err(ElectionError::Configuration(format!(
                "operation timeout for {} must be greater than zero",
                self.key
            )));
        }

        Ok(ResolvedConfig {
            key: self.key,
            ttl: self.ttl,
            tick_interval,
            operation_timeout,
            token: self.token.unwrap_or_else(LeaderToken::generate),
        })
    }
}

/// Default tick interval for a given TTL.
#[must_use]
pub fn derive_tick_interval(ttl: Duration) -> Duration {
    (ttl / DERIVED_TICK_DIVISOR).clamp(MIN_DERIVED_TICK, MAX_DERIVED_TICK)
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn duration_ms(d: Duration) -> u64 {
    d.as_millis() as u64
}

/// A validated configuration with every default filled in.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedConfig {
    pub key: LeaseKey,
    pub ttl: Duration,
    pub tick_interval: Duration,
    pub operation_timeout: Duration,
    pub token: LeaderToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_tick_is_a_third_of_ttl() {
        assert_eq!(
            derive_tick_interval(Duration::from_secs(15)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn derived_tick_is_clamped() {
        assert_eq!(
            derive_tick_interval(Duration::from_millis(1500)),
            MIN_DERIVED_TICK
        );
        assert_eq!(
            derive_tick_interval(Duration::from_secs(300)),
            MAX_DERIVED_TICK
        );
    }

    #[test]
    fn resolve_fills_defaults() {
        let resolved = ElectionConfig::new("leader:sweeper", Duration::from_secs(30))
            .resolve()
            .unwrap();
        assert_eq!(resolved.tick_interval, Duration::from_secs(10));
        assert_eq!(resolved.operation_timeout, Duration::from_secs(10));
        assert_eq!(resolved.token.as_str().len(), 36);
    }

    #[test]
    fn explicit_values_win() {
        let resolved = ElectionConfig::new("leader:sweeper", Duration::from_secs(5))
            .with_tick_interval(Duration::from_secs(1))
            .with_operation_timeout(Duration::from_millis(300))
            .with_token("node-a")
            .resolve()
            .unwrap();
        assert_eq!(resolved.tick_interval, Duration::from_secs(1));
        assert_eq!(resolved.operation_timeout, Duration::from_millis(300));
        assert_eq!(resolved.token.as_str(), "node-a");
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = ElectionConfig::new("  ", Duration::from_secs(5))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ElectionError::Configuration(_)));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let err = ElectionConfig::new("leader:sweeper", Duration::ZERO)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ElectionError::Configuration(_)));
    }

    #[test]
    fn tick_must_be_shorter_than_ttl() {
        let err = ElectionConfig::new("leader:sweeper", Duration::from_secs(2))
            .with_tick_interval(Duration::from_secs(2))
            .resolve()
            .unwrap_err();
        assert!(err.to_string().contains("shorter than the lease TTL"));

        // A derived tick that clamps up to the TTL is rejected too.
        assert!(
            ElectionConfig::new("leader:sweeper", Duration::from_secs(1))
                .resolve()
                .is_err()
        );
    }

    #[test]
    fn zero_operation_timeout_is_rejected() {
        let err = ElectionConfig::new("leader:sweeper", Duration::from_secs(5))
            .with_operation_timeout(Duration::ZERO)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ElectionError::Configuration(_)));
    }
}
