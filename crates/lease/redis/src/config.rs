use std::time::Duration;

use serde::Deserialize;

/// Configuration for the Redis lease store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`).
    pub url: String,

    /// Prefix applied to every lease key. An empty prefix stores keys as-is.
    pub prefix: String,

    /// Number of connections in the `deadpool-redis` pool.
    pub pool_size: usize,

    /// Timeout for acquiring a pooled connection, in milliseconds.
    pub connection_timeout_ms: u64,
}

impl RedisConfig {
    /// Timeout for acquiring a pooled connection.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            prefix: String::from("steward"),
            pool_size: 4,
            connection_timeout_ms: 2_000,
        }
    }
}
