// Storage module - durable key-value persistence for the client
//
// Everything the client remembers between runs lives in one small key-value
// table: the current simulation pointer and one transcript per simulation.
//
//   simulation_id            -> "<opaque id>"
//   chat_history_<sim id>    -> JSON array of messages
//
// The SQLite file sits in the configured data directory. When it cannot be
// opened the app keeps running on an in-memory store (nothing survives a
// restart, but every screen still works).

mod history;
mod session;

pub use history::ChatHistoryStore;
pub use session::SessionContext;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// File name of the database inside the data directory
pub const DB_FILE_NAME: &str = "nomi.db";

/// Errors raised by a key-value backend
#[derive(Debug)]
pub enum StorageError {
    /// SQLite rejected a statement or could not open the file
    Sqlite(rusqlite::Error),
    /// No pooled connection could be obtained
    Pool(String),
    /// A stored value could not be encoded or decoded
    Serialization(serde_json::Error),
    /// The backend is unavailable (only produced by test stores)
    #[cfg(test)]
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "SQLite error: {}", e),
            Self::Pool(msg) => write!(f, "Connection pool error: {}", msg),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            #[cfg(test)]
            Self::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

impl From<r2d2::Error> for StorageError {
    fn from(e: r2d2::Error) -> Self {
        Self::Pool(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

/// Durable string key-value storage scoped to this installation
///
/// Implementations must be cheap to share; the stores above it hold an
/// `Arc<dyn KeyValueStore>` and call it from the UI task.
pub trait KeyValueStore: Send + Sync {
    /// Human-readable backend name for logging
    fn name(&self) -> &'static str;

    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle to whichever backend is active
pub type SharedStore = Arc<dyn KeyValueStore>;

// ─────────────────────────────────────────────────────────────────────────────
// SQLite backend
// ─────────────────────────────────────────────────────────────────────────────

/// Key-value store on a single SQLite table, accessed through an r2d2 pool
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::file(db_path.as_ref())
            .with_init(|conn| conn.execute_batch("PRAGMA busy_timeout=5000;"));
        let pool = Pool::builder().max_size(2).build(manager)?;

        let store = Self { pool };
        store.init_schema(true)?;
        Ok(store)
    }

    /// Private in-memory database (single connection, so every caller sees
    /// the same data)
    #[allow(dead_code)] // Used by tests
    pub fn in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;

        let store = Self { pool };
        store.init_schema(false)?;
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        Ok(self.pool.get()?)
    }

    fn init_schema(&self, wal: bool) -> Result<(), StorageError> {
        let conn = self.conn()?;
        if wal {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────────────────────────

/// Process-local store; the degraded fallback and the default in tests
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Open the SQLite store in `data_dir`, falling back to memory on failure
///
/// Storage problems never stop the app: the failure is logged and the
/// session simply won't survive a restart.
pub fn open_store(data_dir: &Path) -> SharedStore {
    if let Err(e) = std::fs::create_dir_all(data_dir) {
        tracing::warn!(
            "Could not create data directory {}: {} (history will not persist)",
            data_dir.display(),
            e
        );
        return Arc::new(MemoryStore::new());
    }

    let db_path = data_dir.join(DB_FILE_NAME);
    match SqliteStore::open(&db_path) {
        Ok(store) => {
            tracing::debug!("Opened local store at {}", db_path.display());
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                "Could not open local store {}: {} (history will not persist)",
                db_path.display(),
                e
            );
            Arc::new(MemoryStore::new())
        }
    }
}

/// A store whose every operation fails, for exercising degraded paths
#[cfg(test)]
pub(crate) struct UnavailableStore;

#[cfg(test)]
impl KeyValueStore for UnavailableStore {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("disk gone".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disk gone".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disk gone".to_string()))
    }
}
