//! Generic persistent string key-value store over SQLite.

use crate::error::{StorageError, StorageResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Persistent string KV store with one logical table.
///
/// Every operation runs inside its own scoped transaction; an early
/// return rolls the transaction back when it drops, so no exit path
/// leaks a half-applied write. Blocking database work is routed through
/// `spawn_blocking` to keep the async runtime free.
#[derive(Clone)]
pub struct KvStore {
    conn: Arc<Mutex<Connection>>,
}

impl KvStore {
    /// Opens or creates the store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        initialize_schema(&conn)?;
        debug!("kv store opened at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub async fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = Arc::clone(&self.conn);
        let key = key.to_string();
        let value = value.to_string();

        run_blocking(move || {
            let mut conn = lock_conn(&conn)?;
            let tx = conn
                .transaction()
                .map_err(|e| StorageError::PersistFailed(e.to_string()))?;
            tx.execute(
                "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(|e| StorageError::PersistFailed(e.to_string()))?;
            tx.commit()
                .map_err(|e| StorageError::PersistFailed(e.to_string()))
        })
        .await
    }

    /// Returns the value stored under `key`, or `None` when absent.
    pub async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = Arc::clone(&self.conn);
        let key = key.to_string();

        run_blocking(move || {
            let mut conn = lock_conn(&conn)?;
            let tx = conn
                .transaction()
                .map_err(|e| StorageError::LoadFailed(e.to_string()))?;
            let value = tx
                .query_row(
                    "SELECT value FROM kv_entries WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(|e| StorageError::LoadFailed(e.to_string()))?;
            tx.commit()
                .map_err(|e| StorageError::LoadFailed(e.to_string()))?;
            Ok(value)
        })
        .await
    }

    /// Deletes the record under `key`. Deleting an absent key is a no-op.
    pub async fn remove(&self, key: &str) -> StorageResult<()> {
        let conn = Arc::clone(&self.conn);
        let key = key.to_string();

        run_blocking(move || {
            let mut conn = lock_conn(&conn)?;
            let tx = conn
                .transaction()
                .map_err(|e| StorageError::PersistFailed(e.to_string()))?;
            tx.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
                .map_err(|e| StorageError::PersistFailed(e.to_string()))?;
            tx.commit()
                .map_err(|e| StorageError::PersistFailed(e.to_string()))
        })
        .await
    }
}

fn lock_conn(
    conn: &Arc<Mutex<Connection>>,
) -> StorageResult<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| StorageError::Unavailable("store mutex poisoned".to_string()))
}

async fn run_blocking<T, F>(f: F) -> StorageResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StorageResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Unavailable(format!("blocking task failed: {e}")))?
}

fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv_entries (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )
    .map_err(|e| StorageError::Unavailable(e.to_string()))
}
