use std::time::Duration;

use async_trait::async_trait;

use crate::error::LeaseError;
use crate::key::{LeaderToken, LeaseKey};

/// The atomic operations an election performs against a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaseOperation {
    /// `set_if_absent`
    Acquire,
    /// `compare_and_extend`
    Extend,
    /// `compare_and_delete`
    Release,
}

impl LeaseOperation {
    /// Return a string representation of the operation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acquire => "acquire",
            Self::Extend => "extend",
            Self::Release => "release",
        }
    }
}

impl std::fmt::Display for LeaseOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for the key-value store that holds lease records.
///
/// Each mutating method must run as a single indivisible operation on the
/// store. A check-then-act sequence split across two round trips is a bug:
/// another holder's expiry-then-reacquire can interleave between the halves.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Set `key` to `token` with expiry `ttl` only if the key is absent.
    /// Returns `true` if the lease was acquired.
    async fn set_if_absent(
        &self,
        key: &LeaseKey,
        token: &LeaderToken,
        ttl: Duration,
    ) -> Result<bool, LeaseError>;

    /// Reset the expiry of `key` to `ttl` if it currently holds `token`.
    /// Returns `false` and changes nothing otherwise.
    async fn compare_and_extend(
        &self,
        key: &LeaseKey,
        token: &LeaderToken,
        ttl: Duration,
    ) -> Result<bool, LeaseError>;

    /// Delete `key` if it currently holds `token`.
    /// Returns `false` and changes nothing otherwise.
    async fn compare_and_delete(
        &self,
        key: &LeaseKey,
        token: &LeaderToken,
    ) -> Result<bool, LeaseError>;

    /// Return the token currently stored at `key`, if any.
    ///
    /// Diagnostic only: the answer may be stale by the time it is used, so
    /// election decisions must never be based on it.
    async fn holder(&self, key: &LeaseKey) -> Result<Option<LeaderToken>, LeaseError>;
}
