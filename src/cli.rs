//! Command-line interface parsing for catalog-cache
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the immutable [`Settings`] and per-call [`CachePolicy`] values used by the
//! rest of the crate.

use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::api::query::{parse_parameters, set_parameter};
use crate::cache::CachePolicy;
use crate::config::{
    Settings, DEFAULT_CACHE_TTL_SECS, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS,
};
use crate::title::TitlePreference;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// A zero timeout would fail every request immediately
    #[error("Invalid timeout: must be at least 1 second")]
    InvalidTimeout,

    /// No profile directory given and none could be derived from the home directory
    #[error("Could not determine a profile directory; pass --profile-dir")]
    NoProfileDir,

    /// A --param value without `=`
    #[error("Invalid parameter '{0}': expected KEY=VALUE")]
    InvalidParam(String),
}

/// catalog-cache - Fetch media-catalog API responses through a local disk cache
#[derive(Parser, Debug)]
#[command(name = "catalog-cache")]
#[command(about = "Fetch media-catalog API responses through a local disk cache")]
#[command(version)]
pub struct Cli {
    /// Catalog server host
    #[arg(long, global = true, env = "CATALOG_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Catalog server port
    #[arg(long, global = true, env = "CATALOG_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// API key sent with every request
    #[arg(long, global = true, env = "CATALOG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// How long a cached response stays fresh, in seconds
    #[arg(long, global = true, value_name = "SECS", default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl: u64,

    /// Disable the response cache (unless a command passes --force-cache)
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Directory holding cache.db
    #[arg(long, global = true, value_name = "DIR", env = "CATALOG_PROFILE_DIR")]
    pub profile_dir: Option<PathBuf>,

    /// Log cache decisions and requests to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a URL or server path, serving it from the cache when fresh
    ///
    /// Examples:
    ///   catalog-cache get /api/serie?id=12
    ///   catalog-cache get /api/ep/getbyfilename?filename=x --ttl 30
    ///   catalog-cache get /api/version --direct
    Get {
        /// Full URL or path on the configured server
        target: String,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// List every cached response
    List {
        /// Print the rows as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove the cached response for one URL or server path
    Delete {
        /// Full URL or path on the configured server
        target: String,
    },

    /// POST a JSON body to a URL or server path (never cached)
    Post {
        /// Full URL or path on the configured server
        target: String,

        /// JSON request body
        body: String,
    },

    /// Check whether the server answers its version endpoint
    Ping {
        /// Keep retrying once a second for up to SECS while the server starts
        #[arg(long, value_name = "SECS", default_value_t = 0)]
        wait: u32,
    },

    /// Remove every cached response
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Fetch a series or group and print its display title
    Title {
        /// Full URL or path on the configured server
        target: String,

        #[command(flatten)]
        fetch: FetchArgs,

        /// Preferred title language
        #[arg(long, default_value = "en")]
        lang: String,

        /// Preferred title type (prefix with ! to exclude a type)
        #[arg(long, default_value = "official")]
        title_type: String,

        /// Always show the server's own name
        #[arg(long)]
        server_title: bool,
    },
}

/// Per-request cache controls
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchArgs {
    /// Always fetch live and leave the cache untouched
    #[arg(long)]
    pub direct: bool,

    /// Use the cache even with --direct or --no-cache
    #[arg(long)]
    pub force_cache: bool,

    /// Always fetch live and replace the cached response
    #[arg(long, conflicts_with_all = ["direct", "force_cache"])]
    pub refresh: bool,

    /// Override the cache TTL for this request, in seconds
    #[arg(long, value_name = "SECS")]
    pub ttl: Option<u64>,

    /// Set a query parameter on the request URL (empty VALUE removes it)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}

impl FetchArgs {
    /// Decides how this request uses the cache
    pub fn policy(&self, settings: &Settings) -> CachePolicy {
        if self.refresh {
            if settings.cache_enabled {
                return CachePolicy::ForceRefresh;
            }
            return CachePolicy::Bypass;
        }
        CachePolicy::resolve(settings, self.direct, self.force_cache, self.ttl)
    }

    /// Applies every `--param` to `url` in order
    pub fn apply_params(&self, url: &str) -> Result<String, CliError> {
        let url = self.params.iter().try_fold(url.to_string(), |url, param| {
            let (key, value) = param
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| CliError::InvalidParam(param.clone()))?;
            Ok(set_parameter(&url, key, Some(value)))
        })?;

        if !self.params.is_empty() {
            debug!(url = %url, params = ?parse_parameters(&url), "applied query parameters");
        }

        Ok(url)
    }
}

impl Cli {
    /// Builds the runtime settings from parsed arguments.
    ///
    /// # Returns
    /// * `Ok(Settings)` with the server, cache and profile configuration
    /// * `Err(CliError)` if an argument is out of range or no profile
    ///   directory can be found
    pub fn to_settings(&self) -> Result<Settings, CliError> {
        if self.timeout == 0 {
            return Err(CliError::InvalidTimeout);
        }

        let profile_dir = match &self.profile_dir {
            Some(dir) => dir.clone(),
            None => Settings::default_profile_dir().ok_or(CliError::NoProfileDir)?,
        };

        Ok(Settings {
            host: self.host.clone(),
            port: self.port,
            api_key: self.api_key.clone().filter(|key| !key.is_empty()),
            timeout: Duration::from_secs(self.timeout),
            cache_enabled: !self.no_cache,
            cache_ttl: self.cache_ttl,
            profile_dir,
        })
    }
}

/// Builds title preferences from the `title` subcommand flags
pub fn title_preference(lang: &str, title_type: &str, server_title: bool) -> TitlePreference {
    TitlePreference {
        language: lang.to_string(),
        title_type: title_type.to_string(),
        use_server_title: server_title,
    }
}

/// Asks the user to confirm clearing the cache.
///
/// Only an answer starting with `y` or `Y` confirms; end of input declines.
pub fn confirm_clear(mut input: impl BufRead, mut output: impl Write) -> io::Result<bool> {
    write!(output, "Are you sure you want to clear the cache? [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim_start().starts_with(['y', 'Y']))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["catalog-cache", "--profile-dir", "/tmp/catalog-cache-test"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_cli_parse_get_with_defaults() {
        let cli = parse(&["get", "/api/serie?id=1"]);

        assert_eq!(cli.host, DEFAULT_HOST);
        assert_eq!(cli.port, DEFAULT_PORT);
        match cli.command {
            Command::Get { target, fetch } => {
                assert_eq!(target, "/api/serie?id=1");
                assert_eq!(fetch, FetchArgs::default());
            }
            other => panic!("Expected get, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = parse(&["list", "--port", "9000", "--no-cache"]);

        assert_eq!(cli.port, 9000);
        assert!(cli.no_cache);
    }

    #[test]
    fn test_cli_refresh_conflicts_with_direct() {
        let result = Cli::try_parse_from(["catalog-cache", "get", "/x", "--refresh", "--direct"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_to_settings_maps_arguments() {
        let cli = parse(&[
            "--host",
            "media.local",
            "--api-key",
            "k",
            "--timeout",
            "5",
            "--cache-ttl",
            "60",
            "list",
        ]);

        let settings = cli.to_settings().unwrap();

        assert_eq!(settings.host, "media.local");
        assert_eq!(settings.api_key.as_deref(), Some("k"));
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.cache_ttl, 60);
        assert!(settings.cache_enabled);
        assert_eq!(settings.profile_dir, PathBuf::from("/tmp/catalog-cache-test"));
    }

    #[test]
    fn test_to_settings_rejects_zero_timeout() {
        let cli = parse(&["--timeout", "0", "list"]);

        let err = cli.to_settings().unwrap_err();
        assert!(err.to_string().contains("Invalid timeout"));
    }

    #[test]
    fn test_to_settings_drops_empty_api_key() {
        let cli = parse(&["--api-key", "", "list"]);

        assert!(cli.to_settings().unwrap().api_key.is_none());
    }

    #[test]
    fn test_fetch_args_policy() {
        let settings = Settings {
            cache_ttl: 600,
            ..Settings::default()
        };

        let default = FetchArgs::default();
        assert_eq!(default.policy(&settings), CachePolicy::UseCache { ttl: 600 });

        let short = FetchArgs {
            ttl: Some(30),
            ..FetchArgs::default()
        };
        assert_eq!(short.policy(&settings), CachePolicy::UseCache { ttl: 30 });

        let direct = FetchArgs {
            direct: true,
            ..FetchArgs::default()
        };
        assert_eq!(direct.policy(&settings), CachePolicy::Bypass);

        let refresh = FetchArgs {
            refresh: true,
            ..FetchArgs::default()
        };
        assert_eq!(refresh.policy(&settings), CachePolicy::ForceRefresh);
    }

    #[test]
    fn test_refresh_with_cache_disabled_bypasses() {
        let settings = Settings {
            cache_enabled: false,
            ..Settings::default()
        };
        let refresh = FetchArgs {
            refresh: true,
            ..FetchArgs::default()
        };

        assert_eq!(refresh.policy(&settings), CachePolicy::Bypass);
    }

    #[test]
    fn test_apply_params_sets_and_removes() {
        let args = FetchArgs {
            params: vec![
                "level=2".to_string(),
                "id=7".to_string(),
                "tags=".to_string(),
            ],
            ..FetchArgs::default()
        };

        let url = args
            .apply_params("http://127.0.0.1:8111/api/serie?id=1&tags=3")
            .unwrap();

        assert_eq!(url, "http://127.0.0.1:8111/api/serie?id=7&level=2");
    }

    #[test]
    fn test_apply_params_values_decode_back() {
        let args = FetchArgs {
            params: vec!["query=ghost in the shell & co".to_string(), "page=2".to_string()],
            ..FetchArgs::default()
        };

        let url = args.apply_params("http://127.0.0.1:8111/api/search").unwrap();
        assert_eq!(
            url,
            "http://127.0.0.1:8111/api/search?query=ghost+in+the+shell+%26+co&page=2"
        );

        let decoded = parse_parameters(&url);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded["query"], "ghost in the shell & co");
        assert_eq!(decoded["page"], "2");
    }

    #[test]
    fn test_apply_params_rejects_missing_equals() {
        let args = FetchArgs {
            params: vec!["level".to_string()],
            ..FetchArgs::default()
        };

        let err = args.apply_params("http://h/api").unwrap_err();
        assert!(err.to_string().contains("KEY=VALUE"));
    }

    #[test]
    fn test_cli_parse_repeated_params() {
        let cli = parse(&["get", "/api/serie", "--param", "id=1", "--param", "level=2"]);

        match cli.command {
            Command::Get { fetch, .. } => assert_eq!(fetch.params, vec!["id=1", "level=2"]),
            other => panic!("Expected get, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_ping_wait() {
        match parse(&["ping"]).command {
            Command::Ping { wait } => assert_eq!(wait, 0),
            other => panic!("Expected ping, got {:?}", other),
        }
        match parse(&["ping", "--wait", "30"]).command {
            Command::Ping { wait } => assert_eq!(wait, 30),
            other => panic!("Expected ping, got {:?}", other),
        }
    }

    #[test]
    fn test_confirm_clear_answers() {
        let mut prompt = Vec::new();
        assert!(confirm_clear(Cursor::new("y\n"), &mut prompt).unwrap());
        assert!(String::from_utf8(prompt).unwrap().contains("clear the cache"));

        assert!(confirm_clear(Cursor::new("Yes\n"), Vec::new()).unwrap());
        assert!(!confirm_clear(Cursor::new("n\n"), Vec::new()).unwrap());
        assert!(!confirm_clear(Cursor::new("\n"), Vec::new()).unwrap());
        assert!(!confirm_clear(Cursor::new(""), Vec::new()).unwrap());
    }

    #[test]
    fn test_title_preference_from_flags() {
        let pref = title_preference("de", "!short", true);

        assert_eq!(pref.language, "de");
        assert_eq!(pref.title_type, "!short");
        assert!(pref.use_server_title);
    }
}
