//! SQLite-backed local storage.
//!
//! A small key/value table that outlives the process. The event engine keeps
//! its mute flags here; values are opaque strings (usually JSON).
//!
//! The database is stored at `<data dir>/lantern.db` unless `[storage] path`
//! overrides it.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::config::{Config, StorageConfig};

/// Persistent key/value store
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Get the database file path
    pub fn db_path(storage: &StorageConfig) -> Result<PathBuf> {
        match &storage.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Config::data_dir()?.join("lantern.db")),
        }
    }

    /// Open or create the database at the configured location
    pub fn open(storage: &StorageConfig) -> Result<Self> {
        Self::open_at(&Self::db_path(storage)?)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        tracing::info!("Opened database at {:?}", path);
        Ok(db)
    }

    /// Throwaway database for tests and storage-less runs
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-written row
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_on TEXT
            );
            ",
        )?;
        Ok(())
    }

    /// Read a stored value
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or overwrite a value
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO local_storage (key, value, updated_on)
             VALUES (?, ?, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }
}
