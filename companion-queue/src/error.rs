//! Queue error types.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Canonical queue-full message. Fixed and user-facing; asserted
/// verbatim by the UI layer and the test suite.
pub const QUEUE_FULL_MESSAGE: &str = "Queue is full (50 items max)";

/// Errors surfaced by the queue repository and consent gate.
///
/// Storage and crypto failures are caught at the repository boundary and
/// coarsened to [`QueueError::LoadFailed`] / [`QueueError::PersistFailed`];
/// no backend error type crosses this boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("{}", crate::consent::CONSENT_REQUIRED_MESSAGE)]
    ConsentRequired,

    #[error("{}", QUEUE_FULL_MESSAGE)]
    Full,

    #[error("Failed to load offline queue")]
    LoadFailed,

    #[error("Failed to persist offline queue")]
    PersistFailed,
}
