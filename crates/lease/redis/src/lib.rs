//! Redis lease backend for Steward.
//!
//! This crate provides a Redis-backed implementation of the [`LeaseStore`]
//! trait from `steward-lease`.
//!
//! - **Acquire**: `SET key token NX PX ttl`.
//! - **Extend / release**: Lua scripts that compare the stored token before
//!   acting, so the compare and the act run as one step on the server.
//! - **Connection pooling**: `deadpool-redis`.
//!
//! # Consistency
//!
//! | Deployment | Mutual Exclusion | Notes |
//! |------------|------------------|-------|
//! | Single instance | Strong | At most one holder per key |
//! | Sentinel | Weak | A lease may be lost during failover |
//! | Cluster | Weak | A lease may be lost during failover |
//!
//! Redis replication is asynchronous: a lease written to a master that fails
//! before replicating is unknown to the promoted replica, and a second node
//! can acquire the same key. The election layer tolerates this only to the
//! extent that the old leader demotes itself on its next failed extend.
//!
//! # Example
//!
//! ```ignore
//! use steward_lease_redis::{RedisConfig, RedisLeaseStore};
//!
//! let config = RedisConfig {
//!     url: "redis://localhost:6379".into(),
//!     ..RedisConfig::default()
//! };
//! let store = RedisLeaseStore::new(&config)?;
//! ```
//!
//! [`LeaseStore`]: steward_lease::LeaseStore

mod config;
mod scripts;
mod store;

pub use config::RedisConfig;
pub use store::RedisLeaseStore;
