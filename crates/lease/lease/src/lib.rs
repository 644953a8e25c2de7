//! Lease store abstraction for Steward.
//!
//! A lease is a time-bounded exclusive claim on a single key. This crate
//! defines the three atomic operations every backend must provide
//! ([`LeaseStore`]), the identity types that flow through them
//! ([`LeaseKey`], [`LeaderToken`]), and a conformance suite backends run
//! from their own tests ([`testing`]).

pub mod error;
pub mod key;
pub mod store;
pub mod testing;

pub use error::LeaseError;
pub use key::{LeaderToken, LeaseKey};
pub use store::{LeaseOperation, LeaseStore};
