use std::time::Duration;

use thiserror::Error;

/// Errors from lease store operations.
///
/// Every variant means the store could not be reached or did not answer.
/// Callers must treat any of them as "the operation did not succeed".
#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}
