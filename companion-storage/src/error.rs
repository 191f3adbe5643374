//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by the durable store.
///
/// Backend errors are stringified here so no database type crosses the
/// crate boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("failed to load record: {0}")]
    LoadFailed(String),

    #[error("failed to persist record: {0}")]
    PersistFailed(String),
}
