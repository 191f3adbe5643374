//! Encrypted queue persistence over the durable store.

use crate::error::{QueueError, QueueResult};
use companion_crypto::{EncryptedEnvelope, QueueCipher};
use companion_storage::KvStore;
use companion_types::QueueItem;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hard cap on queued items, enforced before any write that would
/// exceed it. Not runtime-configurable.
pub const MAX_QUEUE_SIZE: usize = 50;

/// Storage record holding the encrypted queue blob.
pub const QUEUE_RECORD_KEY: &str = "offline_queue_v1";

const QUEUE_BLOB_VERSION: u32 = 1;

/// Versioned plaintext envelope around the item list.
#[derive(Serialize, Deserialize)]
struct QueueBlob {
    version: u32,
    items: Vec<QueueItem>,
}

/// Persists the ordered queue as one encrypted record.
///
/// Every mutation rewrites the record wholesale: serialize the full list,
/// encrypt, replace. Only the `{iv, ciphertext}` envelope ever reaches
/// storage; plaintext field values do not.
pub struct QueueRepository {
    store: KvStore,
    cipher: QueueCipher,
}

impl QueueRepository {
    pub fn new(store: KvStore, cipher: QueueCipher) -> Self {
        Self { store, cipher }
    }

    /// Loads the queue in stored (FIFO) order. An absent record is an
    /// empty queue.
    pub async fn load_queue(&self) -> QueueResult<Vec<QueueItem>> {
        let stored = self
            .store
            .get(QUEUE_RECORD_KEY)
            .await
            .map_err(|e| load_failed(&e))?;

        let Some(raw) = stored else {
            return Ok(Vec::new());
        };

        let envelope: EncryptedEnvelope =
            serde_json::from_str(&raw).map_err(|e| load_failed(&e))?;
        let plaintext = self
            .cipher
            .decrypt(&envelope)
            .await
            .map_err(|e| load_failed(&e))?;
        let blob: QueueBlob = serde_json::from_str(&plaintext).map_err(|e| load_failed(&e))?;

        if blob.version != QUEUE_BLOB_VERSION {
            debug!("queue blob version {} is unsupported", blob.version);
            return Err(QueueError::LoadFailed);
        }

        Ok(blob.items)
    }

    /// Replaces the persisted queue with `items`, atomically at the
    /// record level.
    pub async fn save_queue(&self, items: &[QueueItem]) -> QueueResult<()> {
        let blob = QueueBlob {
            version: QUEUE_BLOB_VERSION,
            items: items.to_vec(),
        };

        let plaintext = serde_json::to_string(&blob).map_err(|e| persist_failed(&e))?;
        let envelope = self
            .cipher
            .encrypt(&plaintext)
            .await
            .map_err(|e| persist_failed(&e))?;
        let raw = serde_json::to_string(&envelope).map_err(|e| persist_failed(&e))?;

        self.store
            .put(QUEUE_RECORD_KEY, &raw)
            .await
            .map_err(|e| persist_failed(&e))
    }

    /// Appends `item` at the tail, rejecting with [`QueueError::Full`]
    /// when the queue already holds [`MAX_QUEUE_SIZE`] items. The
    /// read-modify-write is not isolated across concurrent callers.
    pub async fn enqueue(&self, item: QueueItem) -> QueueResult<()> {
        let mut items = self.load_queue().await?;
        if items.len() >= MAX_QUEUE_SIZE {
            return Err(QueueError::Full);
        }
        debug!("enqueueing item {} at position {}", item.id, items.len());
        items.push(item);
        self.save_queue(&items).await
    }

    /// Deletes the stored record entirely.
    pub async fn clear_queue(&self) -> QueueResult<()> {
        self.store
            .remove(QUEUE_RECORD_KEY)
            .await
            .map_err(|e| persist_failed(&e))
    }
}

fn load_failed(source: &dyn std::fmt::Display) -> QueueError {
    debug!("queue load failed: {source}");
    QueueError::LoadFailed
}

fn persist_failed(source: &dyn std::fmt::Display) -> QueueError {
    debug!("queue persist failed: {source}");
    QueueError::PersistFailed
}
