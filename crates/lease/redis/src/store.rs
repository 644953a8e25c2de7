use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::{AsyncCommands, Script};

use steward_lease::error::LeaseError;
use steward_lease::key::{LeaderToken, LeaseKey};
use steward_lease::store::LeaseStore;

use crate::config::RedisConfig;
use crate::scripts;

/// Redis-backed implementation of [`LeaseStore`].
///
/// Each lease is a plain Redis string holding the leader token, with a
/// millisecond expiry. See the [crate-level documentation](crate) for the
/// consistency guarantees under replication.
pub struct RedisLeaseStore {
    pool: Pool,
    prefix: String,
}

impl RedisLeaseStore {
    /// Create a new `RedisLeaseStore` from the provided configuration.
    ///
    /// The pool connects lazily, so this succeeds even if Redis is down.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, LeaseError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout()))
                    .create_timeout(Some(config.connection_timeout()))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| LeaseError::Connection(e.to_string()))?
            .map_err(|e| LeaseError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
        })
    }

    /// Build the full Redis key for a lease.
    fn redis_key(&self, key: &LeaseKey) -> String {
        if self.prefix.is_empty() {
            key.as_str().to_owned()
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }

    /// Obtain a connection from the pool.
    async fn conn(&self) -> Result<deadpool_redis::Connection, LeaseError> {
        self.pool
            .get()
            .await
            .map_err(|e| LeaseError::Connection(e.to_string()))
    }
}

/// Redis rejects `PX 0`, so sub-millisecond TTLs round up to one.
fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1)
}

#[async_trait]
impl LeaseStore for RedisLeaseStore {
    async fn set_if_absent(
        &self,
        key: &LeaseKey,
        token: &LeaderToken,
        ttl: Duration,
    ) -> Result<bool, LeaseError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let script = Script::new(scripts::LEASE_ACQUIRE);
        let result: i64 = script
            .key(&redis_key)
            .arg(token.as_str())
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LeaseError::Backend(e.to_string()))?;

        Ok(result == 1)
    }

    async fn compare_and_extend(
        &self,
        key: &LeaseKey,
        token: &LeaderToken,
        ttl: Duration,
    ) -> Result<bool, LeaseError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let script = Script::new(scripts::LEASE_EXTEND);
        let result: i64 = script
            .key(&redis_key)
            .arg(token.as_str())
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LeaseError::Backend(e.to_string()))?;

        Ok(result == 1)
    }

    async fn compare_and_delete(
        &self,
        key: &LeaseKey,
        token: &LeaderToken,
    ) -> Result<bool, LeaseError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let script = Script::new(scripts::LEASE_RELEASE);
        let result: i64 = script
            .key(&redis_key)
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LeaseError::Backend(e.to_string()))?;

        Ok(result == 1)
    }

    async fn holder(&self, key: &LeaseKey) -> Result<Option<LeaderToken>, LeaseError> {
        let redis_key = self.redis_key(key);
        let mut conn = self.conn().await?;

        let current: Option<String> = conn
            .get(&redis_key)
            .await
            .map_err(|e| LeaseError::Backend(e.to_string()))?;

        Ok(current.map(LeaderToken::new))
    }
}
