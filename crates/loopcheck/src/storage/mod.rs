//! Key/value persistence.
//!
//! The tracker only needs `save(key, value)` and `load(key)`. [`SqliteStore`]
//! keeps values in a local `SQLite` database; [`MemoryStore`] keeps them in a
//! map for tests and throwaway runs. Typed access to the individual keys
//! lives in [`crate::persist`].

pub mod migrations;
pub mod schema;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Failures of a [`Store`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// A value could not be written (disk full, quota exceeded, locked...).
    #[error("failed to save '{key}': {message}")]
    WriteFailed {
        /// The key being written.
        key: String,
        /// Underlying reason.
        message: String,
    },

    /// A value could not be read.
    #[error("failed to load '{key}': {message}")]
    ReadFailed {
        /// The key being read.
        key: String,
        /// Underlying reason.
        message: String,
    },

    /// A stored value could not be decoded.
    #[error("stored value for '{key}' is malformed: {message}")]
    Malformed {
        /// The key whose value is bad.
        key: String,
        /// Decoder message.
        message: String,
    },
}

/// Durable string storage keyed by name.
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriteFailed`] if the value could not be stored.
    fn save(&self, key: &str, value: &str) -> std::result::Result<(), StorageError>;

    /// Read the value under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadFailed`] if the backend could not be read.
    fn load(&self, key: &str) -> std::result::Result<Option<String>, StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WriteFailed`] if the backend rejected the delete.
    fn remove(&self, key: &str) -> std::result::Result<(), StorageError>;
}

/// `SQLite`-backed [`Store`].
#[derive(Debug)]
pub struct SqliteStore {
    // rusqlite connections are not Sync
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Poisoning is ignored; every write is a single statement.
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Store for SqliteStore {
    fn save(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        self.lock()
            .execute(
                r"
                INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                ",
                params![key, value],
            )
            .map_err(|e| StorageError::WriteFailed {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        debug!(key, bytes = value.len(), "saved value");
        Ok(())
    }

    fn load(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        self.lock()
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| StorageError::ReadFailed {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    fn remove(&self, key: &str) -> std::result::Result<(), StorageError> {
        self.lock()
            .execute("DELETE FROM kv_store WHERE key = ?1", [key])
            .map_err(|e| StorageError::WriteFailed {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

/// In-memory [`Store`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn save(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn remove(&self, key: &str) -> std::result::Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}
