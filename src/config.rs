//! Runtime settings for the catalog client
//!
//! `Settings` is built once at startup (see `cli::Cli::to_settings`) and passed
//! by reference to everything that needs it. Nothing reads configuration from
//! global state.

use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 8111;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default cache TTL in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 1800;

/// Delay between server checks while waiting for it to start
pub const STARTUP_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Immutable configuration for the API client and response cache
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Catalog server host name or address
    pub host: String,
    /// Catalog server port
    pub port: u16,
    /// Key sent in the `apikey` header, if any
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Whether responses may be served from the store
    pub cache_enabled: bool,
    /// Default maximum age of a stored response, in seconds
    pub cache_ttl: u64,
    /// Writable directory holding `cache.db`
    pub profile_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_enabled: true,
            cache_ttl: DEFAULT_CACHE_TTL_SECS,
            profile_dir: Settings::default_profile_dir()
                .unwrap_or_else(|| PathBuf::from(".catalog-cache")),
        }
    }
}

impl Settings {
    /// XDG-compliant per-user data directory (`~/.local/share/catalog-cache`
    /// on Linux). Returns `None` if no home directory can be determined.
    pub fn default_profile_dir() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "catalog-cache")?;
        Some(project_dirs.data_dir().to_path_buf())
    }

    /// Base URL of the catalog server, without a trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Turns a server path such as `/api/serie?id=1` into a full URL.
    /// Absolute `http://` and `https://` URLs are returned unchanged.
    pub fn resolve_url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }

        let path = target.trim_start_matches('/');
        format!("{}/{}", self.base_url(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 8111);
        assert!(settings.api_key.is_none());
        assert!(settings.cache_enabled);
        assert_eq!(settings.cache_ttl, DEFAULT_CACHE_TTL_SECS);
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_base_url() {
        let settings = Settings {
            host: "media.local".to_string(),
            port: 9000,
            ..Settings::default()
        };

        assert_eq!(settings.base_url(), "http://media.local:9000");
    }

    #[test]
    fn test_resolve_url_joins_relative_paths() {
        let settings = Settings::default();

        assert_eq!(
            settings.resolve_url("/api/serie?id=1"),
            "http://127.0.0.1:8111/api/serie?id=1"
        );
        assert_eq!(
            settings.resolve_url("api/filter"),
            "http://127.0.0.1:8111/api/filter"
        );
    }

    #[test]
    fn test_resolve_url_keeps_absolute_urls() {
        let settings = Settings::default();

        assert_eq!(
            settings.resolve_url("https://example.org/api/version"),
            "https://example.org/api/version"
        );
    }

    #[test]
    fn test_default_profile_dir_is_project_scoped() {
        if let Some(dir) = Settings::default_profile_dir() {
            assert!(
                dir.to_string_lossy().contains("catalog-cache"),
                "Profile path should contain project name"
            );
        }
        // Test passes if no home directory is available (e.g. in CI)
    }
}
