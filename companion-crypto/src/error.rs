//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in the queue crypto codec.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("cryptographic backend unavailable")]
    Unavailable,

    #[error("failed to load queue key: {0}")]
    KeyLoad(String),

    #[error("failed to persist queue key: {0}")]
    KeyPersist(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("decryption failed (wrong key or tampered data)")]
    Decrypt,
}
