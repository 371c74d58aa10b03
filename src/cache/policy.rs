//! Freshness rules for cached responses

use chrono::Utc;

use crate::config::Settings;

/// Current time in seconds since the Unix epoch, with sub-second precision
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Whether an entry captured at `captured_at` may still be served at `now`.
///
/// An entry exactly `ttl_seconds` old is still fresh.
pub fn is_fresh(captured_at: f64, ttl_seconds: u64, now: f64) -> bool {
    now - captured_at <= ttl_seconds as f64
}

/// How a single fetch interacts with the response store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Serve a stored body younger than `ttl` seconds, otherwise fetch and store
    UseCache { ttl: u64 },
    /// Always fetch, then replace the stored body
    ForceRefresh,
    /// Always fetch and leave the store untouched
    Bypass,
}

impl CachePolicy {
    /// Derives the policy for one call from the configured defaults.
    ///
    /// * `direct` - the endpoint must always be live (status checks, URLs
    ///   carrying credentials)
    /// * `force_cache` - use the store even if `direct` is set or caching is
    ///   disabled in `settings`
    /// * `ttl_override` - shorter TTL for fast-changing data such as watch
    ///   state; `None` or `Some(0)` keeps the configured default
    pub fn resolve(
        settings: &Settings,
        direct: bool,
        force_cache: bool,
        ttl_override: Option<u64>,
    ) -> Self {
        if (direct || !settings.cache_enabled) && !force_cache {
            return CachePolicy::Bypass;
        }

        let ttl = ttl_override
            .filter(|ttl| *ttl > 0)
            .unwrap_or(settings.cache_ttl);
        CachePolicy::UseCache { ttl }
    }
}
