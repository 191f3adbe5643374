//! Transport boundary: the backend's idempotent submit contract.

use async_trait::async_trait;
use companion_types::QueueItem;
use thiserror::Error;

/// Classified code recorded when the backend is unreachable.
pub const BACKEND_UNAVAILABLE_CODE: &str = "BACKEND_UNAVAILABLE";
/// Classified code recorded for every other delivery failure.
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN";

/// Delivery failure as classified by the engine.
///
/// Only the backend-unavailable sentinel is recognized distinctly; all
/// other failures are `Unknown`. An implementation that adds submit
/// timeouts must classify timeout as the retryable
/// [`TransportError::BackendUnavailable`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Backend unavailable")]
    BackendUnavailable,

    #[error("submission failed: {0}")]
    Unknown(String),
}

impl TransportError {
    /// The classified code persisted in an item's retry metadata.
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::BackendUnavailable => BACKEND_UNAVAILABLE_CODE,
            TransportError::Unknown(_) => UNKNOWN_ERROR_CODE,
        }
    }
}

/// Backend submit collaborator.
///
/// The engine never interprets the submitted payload; the item's id
/// doubles as an idempotency key so a retried submit is safe.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit(&self, item: &QueueItem) -> Result<(), TransportError>;
}
