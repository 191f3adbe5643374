//! Sync wiring error types.

use thiserror::Error;

/// Result type for sync wiring operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors from the engine's command wiring.
///
/// Pass failures never surface here; a pass always terminates in a
/// [`crate::PassOutcome`] plus an outward signal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("sync engine not running")]
    EngineStopped,
}
