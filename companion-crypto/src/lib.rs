//! At-rest encryption for the companion offline queue.
//!
//! Provides the queue's crypto codec:
//! - One 256-bit ChaCha20-Poly1305 key per installation, generated on
//!   first use and persisted base64-encoded in the durable store
//! - Authenticated encryption of the serialized queue blob with a fresh
//!   random nonce per call
//!
//! The key is cached in-process behind an init-once guard and reused for
//! every encrypt/decrypt call. It is persisted under its own record,
//! never inside the queue record, and never leaves this crate in
//! plaintext.

mod cipher;
mod error;

pub use cipher::{EncryptedEnvelope, QueueCipher, KEY_RECORD_KEY, KEY_SIZE, NONCE_SIZE};
pub use error::{CryptoError, CryptoResult};
