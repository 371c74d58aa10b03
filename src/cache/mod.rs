//! Cache module for storing API responses to disk
//!
//! This module provides a SQLite-backed store that keeps one response body per
//! request URL, plus the freshness rules that decide when a stored body may be
//! served instead of going back to the server.

mod policy;
mod store;

pub use policy::{is_fresh, now_timestamp, CachePolicy};
pub use store::{CacheEntry, CachedBody, ResponseStore, StoreError, CACHE_FILE_NAME};
