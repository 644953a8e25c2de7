//! Lease-based leader election for Steward.
//!
//! Many equivalent instances share one lease key in a [`LeaseStore`]; the
//! instance whose token is stored there is the leader and runs the
//! singleton duty. Leadership is kept by renewing the lease every tick and
//! lost the moment a renewal cannot be confirmed.
//!
//! This is not consensus: correctness rests on the store being the single
//! source of truth for the key.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use steward_election::{ElectionConfig, ElectionEngine, HandlerError, LeadershipHandler};
//!
//! struct Sweeper;
//!
//! #[async_trait::async_trait]
//! impl LeadershipHandler for Sweeper {
//!     async fn on_leader(&self) -> Result<(), HandlerError> {
//!         // spawn the sweep loop
//!         Ok(())
//!     }
//!     async fn on_follower(&self) -> Result<(), HandlerError> {
//!         // cancel the sweep loop
//!         Ok(())
//!     }
//! }
//!
//! let engine = ElectionEngine::builder()
//!     .config(ElectionConfig::new("leader:job-sweeper", Duration::from_secs(15)))
//!     .store(Arc::new(store))
//!     .handler(Arc::new(Sweeper))
//!     .build()?;
//! engine.start().await;
//! ```
//!
//! [`LeaseStore`]: steward_lease::LeaseStore

pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod observer;

pub use config::ElectionConfig;
pub use engine::{ElectionEngine, ElectionEngineBuilder};
pub use error::{ElectionError, HandlerError};
pub use handler::{LeadershipHandler, NoopHandler};
pub use metrics::{ElectionMetrics, MetricsSnapshot};
pub use observer::{AttemptResult, ElectionObserver, TickOutcome, TracingObserver, Transition};
