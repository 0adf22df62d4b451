//! Key-value persistence for placement data.
//!
//! Every entity type lives as one JSON array under a fixed key. Callers load
//! whole arrays, transform them in memory and write them back; a [`Batch`]
//! writes several keys atomically.

use crate::db;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub mod keys {
    pub const COMPANIES: &str = "placements.companies";
    pub const DRIVES: &str = "placements.drives";
    pub const STUDENTS: &str = "placements.students";
    pub const APPLICATIONS: &str = "placements.applications";
    pub const SLOTS: &str = "placements.slots";
    pub const ASSIGNMENTS: &str = "placements.assignments";
    pub const OFFERS: &str = "placements.offers";
    pub const RUNS: &str = "placements.runs";
    pub const ACTIVE_DRIVE: &str = "placements.activeDriveId";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored value under {key} is invalid: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait KvStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes all entries or none of them.
    fn put_raw_many(&mut self, entries: Vec<(String, String)>) -> Result<(), StoreError>;
}

/// Loads the value under `key`, or `T::default()` when the key was never
/// written.
pub fn load<T>(store: &dyn KvStore, key: &str) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match store.get_raw(key)? {
        Some(text) => serde_json::from_str(&text).map_err(|source| StoreError::Decode {
            key: key.to_string(),
            source,
        }),
        None => Ok(T::default()),
    }
}

pub fn save<T: Serialize>(store: &mut dyn KvStore, key: &str, value: &T) -> Result<(), StoreError> {
    let mut batch = Batch::default();
    batch.put(key, value)?;
    batch.commit(store)
}

#[derive(Debug, Default)]
pub struct Batch {
    entries: Vec<(String, String)>,
}

impl Batch {
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<&mut Self, StoreError> {
        let text = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.entries.push((key.to_string(), text));
        Ok(self)
    }

    pub fn commit(self, store: &mut dyn KvStore) -> Result<(), StoreError> {
        if self.entries.is_empty() {
            return Ok(());
        }
        debug!(keys = self.entries.len(), "committing store batch");
        store.put_raw_many(self.entries)
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_db(workspace)?,
        })
    }

    /// Flushes the WAL so the database file alone is a complete copy.
    pub fn checkpoint(&self) {
        let _ = self.conn.execute_batch("PRAGMA wal_checkpoint(FULL)");
    }

    pub fn key_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM kv", [], |r| r.get(0))?)
    }
}

impl KvStore for SqliteStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
            .optional()?)
    }

    fn put_raw_many(&mut self, entries: Vec<(String, String)>) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        for (key, value) in &entries {
            tx.execute(
                "INSERT INTO kv(key, value, updated_at) VALUES(?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                (key, value, &now),
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl KvStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.map.get(key).cloned())
    }

    fn put_raw_many(&mut self, entries: Vec<(String, String)>) -> Result<(), StoreError> {
        self.map.extend(entries);
        Ok(())
    }
}
