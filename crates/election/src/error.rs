use steward_lease::{LeaseError, LeaseKey, LeaseOperation};
use thiserror::Error;

/// Errors raised by the election engine.
///
/// Only [`Configuration`](Self::Configuration) ever reaches a caller; the
/// other variants are recovered inside the tick loop and reported through
/// the [`ElectionObserver`](crate::ElectionObserver).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ElectionError {
    #[error("invalid election configuration: {0}")]
    Configuration(String),

    #[error("lease store unavailable during {operation} of {key}: {source}")]
    StoreUnavailable {
        operation: LeaseOperation,
        key: LeaseKey,
        #[source]
        source: LeaseError,
    },

    #[error("{callback} callback failed: {source}")]
    Callback {
        callback: &'static str,
        #[source]
        source: HandlerError,
    },
}

/// Error returned by a [`LeadershipHandler`](crate::LeadershipHandler).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandlerError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Create a handler error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}
