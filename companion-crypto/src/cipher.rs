//! ChaCha20-Poly1305 codec with a persisted per-installation key.

use crate::error::{CryptoError, CryptoResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use companion_storage::KvStore;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use zeroize::Zeroize;

/// ChaCha20-Poly1305 key size in bytes.
pub const KEY_SIZE: usize = 32;
/// Nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// Storage record holding the base64-encoded key material.
pub const KEY_RECORD_KEY: &str = "offline_queue_key_v1";

/// Encrypted blob as persisted: nonce and ciphertext, both base64.
///
/// The nonce is drawn fresh from the OS RNG for every encryption and is
/// never reused under the same key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    pub iv: String,
    pub ciphertext: String,
}

/// The queue's crypto codec.
///
/// Owns the single symmetric key: loads it from the durable store on
/// first use, generating and persisting it when absent. The imported key
/// is cached for the life of the process behind a double-checked lock.
pub struct QueueCipher {
    store: KvStore,
    key: RwLock<Option<[u8; KEY_SIZE]>>,
}

impl QueueCipher {
    pub fn new(store: KvStore) -> Self {
        Self {
            store,
            key: RwLock::new(None),
        }
    }

    /// Encrypts a plaintext string into a persistable envelope.
    pub async fn encrypt(&self, plaintext: &str) -> CryptoResult<EncryptedEnvelope> {
        let key = self.get_or_create_key().await?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|_| CryptoError::Unavailable)?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

        Ok(EncryptedEnvelope {
            iv: STANDARD.encode(nonce_bytes),
            ciphertext: STANDARD.encode(ciphertext),
        })
    }

    /// Decrypts an envelope back to the original plaintext string.
    pub async fn decrypt(&self, envelope: &EncryptedEnvelope) -> CryptoResult<String> {
        let key = self.get_or_create_key().await?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));

        let nonce_bytes = STANDARD
            .decode(&envelope.iv)
            .map_err(|_| CryptoError::Decrypt)?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(CryptoError::Decrypt);
        }
        let ciphertext = STANDARD
            .decode(&envelope.ciphertext)
            .map_err(|_| CryptoError::Decrypt)?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| CryptoError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
    }

    /// Returns the installation key, importing or creating it on first use.
    ///
    /// Double-checked: the read lock covers the steady state, the write
    /// lock covers the one-time load-or-generate.
    async fn get_or_create_key(&self) -> CryptoResult<[u8; KEY_SIZE]> {
        if let Some(key) = *self.key.read().await {
            return Ok(key);
        }

        let mut cached = self.key.write().await;
        if let Some(key) = *cached {
            return Ok(key);
        }

        let stored = self
            .store
            .get(KEY_RECORD_KEY)
            .await
            .map_err(|e| CryptoError::KeyLoad(e.to_string()))?;

        let key = match stored {
            Some(encoded) => import_key(&encoded)?,
            None => {
                let key = generate_key()?;
                self.store
                    .put(KEY_RECORD_KEY, &STANDARD.encode(key))
                    .await
                    .map_err(|e| CryptoError::KeyPersist(e.to_string()))?;
                key
            }
        };

        *cached = Some(key);
        Ok(key)
    }
}

fn import_key(encoded: &str) -> CryptoResult<[u8; KEY_SIZE]> {
    let mut raw = STANDARD
        .decode(encoded)
        .map_err(|_| CryptoError::KeyLoad("invalid base64 key material".to_string()))?;
    if raw.len() != KEY_SIZE {
        raw.zeroize();
        return Err(CryptoError::KeyLoad(format!(
            "invalid key length: expected {KEY_SIZE}, got {}",
            raw.len()
        )));
    }
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&raw);
    raw.zeroize();
    Ok(key)
}

fn generate_key() -> CryptoResult<[u8; KEY_SIZE]> {
    let mut key = [0u8; KEY_SIZE];
    OsRng
        .try_fill_bytes(&mut key)
        .map_err(|_| CryptoError::Unavailable)?;
    Ok(key)
}
