//! SQLite cache backend
//!
//! A single-table key-value namespace with TTL expiry and JSON side
//! metadata. Both keyspaces (tree and non-tree) share this namespace;
//! keys are prefixed by the key-derivation scheme.

use crate::cache::store::{CacheEntry, CacheResult, CacheStore, SideMetadata};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Initializes the cache schema on a connection
fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS cache_entries (
            key        TEXT PRIMARY KEY,
            value      TEXT NOT NULL,
            metadata   TEXT,
            created_at TEXT NOT NULL,
            expires_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_cache_expires ON cache_entries(expires_at);
    ",
    )
}

/// SQLite-backed cache store
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Opens or creates a cache database at the given path
    pub fn new(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Deletes all expired entries, returning how many were removed
    pub fn purge_expired(&self) -> CacheResult<usize> {
        let conn = self.conn.lock().expect("cache connection poisoned");
        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE expires_at < ?1",
            params![Utc::now().timestamp()],
        )?;
        Ok(removed)
    }
}

#[async_trait]
impl CacheStore for SqliteCache {
    async fn get_with_metadata(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let conn = self.conn.lock().expect("cache connection poisoned");

        let row: Option<(String, Option<String>, i64)> = conn
            .query_row(
                "SELECT value, metadata, expires_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let (value, metadata_json, expires_at) = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        if expires_at < Utc::now().timestamp() {
            conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
            return Ok(None);
        }

        let metadata = match metadata_json {
            Some(json) => Some(serde_json::from_str::<SideMetadata>(&json)?),
            None => None,
        };

        Ok(Some(CacheEntry { value, metadata }))
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        metadata: Option<SideMetadata>,
    ) -> CacheResult<()> {
        let metadata_json = match &metadata {
            Some(metadata) => Some(serde_json::to_string(metadata)?),
            None => None,
        };

        let now = Utc::now();
        let expires_at = now.timestamp() + ttl.as_secs() as i64;

        let conn = self.conn.lock().expect("cache connection poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, value, metadata, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![key, value, metadata_json, now.to_rfc3339(), expires_at],
        )?;

        Ok(())
    }
}
