//! Fetch-or-cache entry point for catalog requests
//!
//! `CachedFetcher` decides, per call, whether a request can be answered from
//! the response store or must go to the server. Any live fetch made under a
//! caching policy writes its result back to the store, so `get` is not
//! read-only.

use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::cache::{is_fresh, now_timestamp, CachePolicy, ResponseStore};
use crate::config::Settings;

/// Source of live response bodies
#[allow(async_fn_in_trait)]
pub trait Fetch {
    /// Fetches the body at `url` from the server
    async fn fetch(&self, url: &str) -> Result<String, ApiError>;
}

impl Fetch for ApiClient {
    async fn fetch(&self, url: &str) -> Result<String, ApiError> {
        self.get_data(url, None).await
    }
}

/// Combines a live fetcher with the optional response store
#[derive(Debug)]
pub struct CachedFetcher<F> {
    fetcher: F,
    store: Option<ResponseStore>,
}

impl<F: Fetch> CachedFetcher<F> {
    /// Creates a fetcher with an already opened store, or none at all
    pub fn new(fetcher: F, store: Option<ResponseStore>) -> Self {
        Self { fetcher, store }
    }

    /// Creates a fetcher using the store in the configured profile directory.
    ///
    /// If the store cannot be opened, the fetcher still works and every
    /// request goes to the server.
    pub fn open(fetcher: F, settings: &Settings) -> Self {
        let store = match ResponseStore::open(&settings.profile_dir) {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(error = %e, "response cache unavailable, fetching live");
                None
            }
        };
        Self::new(fetcher, store)
    }

    /// The underlying response store, if one is open
    pub fn store(&self) -> Option<&ResponseStore> {
        self.store.as_ref()
    }

    /// The live fetcher
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Returns the body for `url` according to `policy`.
    ///
    /// Fetch errors always propagate; a stale entry is never served in place
    /// of a failed refresh. Storage errors are logged and treated as a miss
    /// (on read) or ignored (on write).
    pub async fn get(&self, url: &str, policy: CachePolicy) -> Result<String, ApiError> {
        let store = match (&self.store, policy) {
            (Some(store), CachePolicy::UseCache { .. } | CachePolicy::ForceRefresh) => store,
            _ => {
                debug!(url, "bypassing response cache");
                return self.fetcher.fetch(url).await;
            }
        };

        if let CachePolicy::UseCache { ttl } = policy {
            match store.get(url) {
                Ok(Some(cached)) if is_fresh(cached.captured_at, ttl, now_timestamp()) => {
                    debug!(url, "cache hit");
                    return Ok(cached.value);
                }
                Ok(Some(_)) => debug!(url, ttl, "cached data is stale"),
                Ok(None) => debug!(url, "no cached data"),
                Err(e) => warn!(url, error = %e, "cache read failed, treating as miss"),
            }
        }

        let body = self.fetcher.fetch(url).await?;

        if let Err(e) = store.put(url, &body) {
            warn!(url, error = %e, "failed to store response");
        }

        Ok(body)
    }
}
