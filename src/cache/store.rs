//! SQLite-backed store for API response bodies
//!
//! Provides a `ResponseStore` that keeps one row per request URL in
//! `<profile_dir>/cache.db`. Every operation opens its own connection and
//! closes it on return, so a short-lived process never holds the file open
//! between calls.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use super::policy::now_timestamp;

/// File name of the store inside the profile directory
pub const CACHE_FILE_NAME: &str = "cache.db";

/// Errors that can occur when accessing the response store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The profile directory could not be created
    #[error("Failed to create profile directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// SQLite open or query failure
    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A full row of the store, as returned by [`ResponseStore::get_all`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    /// The request URL, stored verbatim
    pub key: String,
    /// The raw response body
    pub value: String,
    /// Seconds since the Unix epoch at which the row was written
    pub captured_at: f64,
}

impl CacheEntry {
    /// Returns the capture time as a UTC datetime, if representable
    pub fn captured_at_utc(&self) -> Option<DateTime<Utc>> {
        let secs = self.captured_at.floor();
        let nanos = ((self.captured_at - secs) * 1_000_000_000.0) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
    }
}

/// Result of a single-key lookup
#[derive(Debug, Clone, PartialEq)]
pub struct CachedBody {
    pub value: String,
    pub captured_at: f64,
}

/// Disk-backed key-value store for response bodies
#[derive(Debug, Clone)]
pub struct ResponseStore {
    db_path: PathBuf,
}

impl ResponseStore {
    /// Opens the store in `profile_dir`, creating the directory and the
    /// schema when they are missing.
    pub fn open(profile_dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(profile_dir).map_err(|source| StoreError::CreateDir {
            path: profile_dir.to_path_buf(),
            source,
        })?;

        let store = Self {
            db_path: profile_dir.join(CACHE_FILE_NAME),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Path of the SQLite file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Ok(Connection::open(&self.db_path)?)
    }

    /// Creates the `cache` table and its unique key index if absent.
    ///
    /// Safe to call on every start. A file written by an older client may
    /// already hold duplicate keys, in which case the index cannot be built;
    /// that failure is logged and lookups fall back to the newest row.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache (url TEXT NULL, json TEXT NULL, created REAL NULL)",
            [],
        )?;

        if let Err(e) = conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_cache_url ON cache (url)",
            [],
        ) {
            warn!(error = %e, path = %self.db_path.display(), "unique cache key index unavailable");
        }

        Ok(())
    }

    /// Lists every row, oldest first
    pub fn get_all(&self) -> Result<Vec<CacheEntry>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT url, json, created FROM cache ORDER BY created ASC")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<f64>>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            // Rows without a key cannot be looked up; skip them
            if let (Some(key), value, captured_at) = row? {
                entries.push(CacheEntry {
                    key,
                    value: value.unwrap_or_default(),
                    captured_at: captured_at.unwrap_or_default(),
                });
            }
        }

        Ok(entries)
    }

    /// Looks up the body stored for `key`.
    ///
    /// Returns `Ok(None)` when no usable row exists. When a legacy file holds
    /// several rows for the key, the most recently captured one wins.
    pub fn get(&self, key: &str) -> Result<Option<CachedBody>, StoreError> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT json, created FROM cache WHERE url = ?1 ORDER BY created DESC LIMIT 1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                    ))
                },
            )
            .optional()?;

        Ok(match row {
            Some((Some(value), Some(captured_at))) => Some(CachedBody { value, captured_at }),
            _ => None,
        })
    }

    /// Stores `value` under `key`, stamped with the current time
    pub fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.put_at(key, value, now_timestamp())
    }

    /// Stores `value` under `key` with an explicit capture time.
    ///
    /// Any existing rows for the key are replaced in the same transaction,
    /// so exactly one row remains afterwards.
    pub fn put_at(&self, key: &str, value: &str, captured_at: f64) -> Result<(), StoreError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let replaced = tx.execute("DELETE FROM cache WHERE url = ?1", params![key])?;
        tx.execute(
            "INSERT INTO cache (url, json, created) VALUES (?1, ?2, ?3)",
            params![key, value, captured_at],
        )?;
        tx.commit()?;

        debug!(url = key, replaced, "stored response");
        Ok(())
    }

    /// Removes the rows stored for `key`, returning how many were deleted
    pub fn delete_one(&self, key: &str) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        Ok(conn.execute("DELETE FROM cache WHERE url = ?1", params![key])?)
    }

    /// Removes every row, returning how many were deleted
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        Ok(conn.execute("DELETE FROM cache", [])?)
    }
}
