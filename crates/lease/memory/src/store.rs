use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use steward_lease::error::LeaseError;
use steward_lease::key::{LeaderToken, LeaseKey};
use steward_lease::store::LeaseStore;

/// Internal entry representing a held lease.
#[derive(Debug, Clone)]
struct LeaseEntry {
    token: LeaderToken,
    expires_at: Instant,
}

impl LeaseEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory [`LeaseStore`] backed by a [`DashMap`].
///
/// Expiry is lazy and measured on the tokio clock, so tests running with a
/// paused clock can drive expiry with `tokio::time::advance`. Each operation
/// holds the map shard lock for its key for its whole duration, which makes
/// the compare and the act indivisible.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryLeaseStore {
    leases: Arc<DashMap<String, LeaseEntry>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryLeaseStore {
    /// Create a new, empty in-memory lease store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a store outage. While unavailable, every operation fails
    /// with [`LeaseError::Connection`] and no lease is touched; expiry keeps
    /// running.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of unexpired leases currently held.
    pub fn live_leases(&self) -> usize {
        self.leases.iter().filter(|e| !e.is_expired()).count()
    }

    fn check_available(&self) -> Result<(), LeaseError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LeaseError::Connection(
                "in-memory lease store is marked unavailable".to_owned(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn set_if_absent(
        &self,
        key: &LeaseKey,
        token: &LeaderToken,
        ttl: Duration,
    ) -> Result<bool, LeaseError> {
        self.check_available()?;

        let entry = LeaseEntry {
            token: token.clone(),
            expires_at: Instant::now() + ttl,
        };
        match self.leases.entry(key.as_str().to_owned()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(entry);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                Ok(true)
            }
        }
    }

    async fn compare_and_extend(
        &self,
        key: &LeaseKey,
        token: &LeaderToken,
        ttl: Duration,
    ) -> Result<bool, LeaseError> {
        self.check_available()?;

        let Some(mut entry) = self.leases.get_mut(key.as_str()) else {
            return Ok(false);
        };
        if entry.is_expired() || entry.token != *token {
            return Ok(false);
        }
        entry.expires_at = Instant::now() + ttl;
        Ok(true)
    }

    async fn compare_and_delete(
        &self,
        key: &LeaseKey,
        token: &LeaderToken,
    ) -> Result<bool, LeaseError> {
        self.check_available()?;

        // Expired entries are gone as far as callers are concerned.
        self.leases.remove_if(key.as_str(), |_, e| e.is_expired());
        Ok(self
            .leases
            .remove_if(key.as_str(), |_, e| e.token == *token)
            .is_some())
    }

    async fn holder(&self, key: &LeaseKey) -> Result<Option<LeaderToken>, LeaseError> {
        self.check_available()?;

        Ok(self
            .leases
            .get(key.as_str())
            .filter(|e| !e.is_expired())
            .map(|e| e.token.clone()))
    }
}
