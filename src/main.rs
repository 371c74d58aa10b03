//! catalog-cache - Fetch media-catalog API responses through a local disk cache
//!
//! A command-line front end for the catalog server's REST API. Responses are
//! kept in a SQLite file in the profile directory and served from there while
//! they are fresh.

use std::error::Error;
use std::io;
use std::process::ExitCode;

use chrono::SecondsFormat;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use catalog_cache::api::ApiClient;
use catalog_cache::cache::{now_timestamp, ResponseStore};
use catalog_cache::cli::{confirm_clear, title_preference, Cli, Command, FetchArgs};
use catalog_cache::config::{Settings, STARTUP_POLL_INTERVAL};
use catalog_cache::fetch::CachedFetcher;
use catalog_cache::title::{select_title, TitledNode};

/// Sets up stderr logging. `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("catalog_cache={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Fetches `target` through the cache according to `fetch`
async fn fetch_body(
    settings: &Settings,
    target: &str,
    fetch: &FetchArgs,
) -> Result<String, Box<dyn Error>> {
    let client = ApiClient::new(settings)?;
    let fetcher = CachedFetcher::open(client, settings);
    let url = fetch.apply_params(&settings.resolve_url(target))?;

    Ok(fetcher.get(&url, fetch.policy(settings)).await?)
}

fn list_entries(settings: &Settings, json: bool) -> Result<(), Box<dyn Error>> {
    let store = ResponseStore::open(&settings.profile_dir)?;
    let entries = store.get_all()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No cached responses in {}", store.path().display());
        return Ok(());
    }

    let now = now_timestamp();
    for entry in &entries {
        let captured = entry
            .captured_at_utc()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| "-".to_string());
        let age = (now - entry.captured_at).max(0.0) as u64;
        println!(
            "{}  {:>6}s  {:>8}B  {}",
            captured,
            age,
            entry.value.len(),
            entry.key
        );
    }

    Ok(())
}

async fn run(command: Command, settings: &Settings) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Get { target, fetch } => {
            let body = fetch_body(settings, &target, &fetch).await?;
            println!("{}", body);
        }
        Command::List { json } => list_entries(settings, json)?,
        Command::Delete { target } => {
            let url = settings.resolve_url(&target);
            let removed = ResponseStore::open(&settings.profile_dir)?.delete_one(&url)?;
            println!("Removed {} cached response(s) for {}", removed, url);
        }
        Command::Post { target, body } => {
            let body: serde_json::Value = serde_json::from_str(&body)?;
            let client = ApiClient::new(settings)?;
            let response = client.post_json(&settings.resolve_url(&target), &body).await?;
            if !response.is_empty() {
                println!("{}", response);
            }
        }
        Command::Ping { wait } => {
            let base = settings.base_url();
            let client = ApiClient::new(settings)?;
            if !client
                .wait_for_server(&base, wait, STARTUP_POLL_INTERVAL)
                .await
            {
                return Err(format!("{} is unreachable", base).into());
            }
            println!("{} is reachable", base);
        }
        Command::Clear { yes } => {
            if !yes && !confirm_clear(io::stdin().lock(), io::stdout())? {
                println!("Aborted");
                return Ok(());
            }
            let removed = ResponseStore::open(&settings.profile_dir)?.clear_all()?;
            println!("Cleared {} cached response(s)", removed);
        }
        Command::Title {
            target,
            fetch,
            lang,
            title_type,
            server_title,
        } => {
            let body = fetch_body(settings, &target, &fetch).await?;
            let node: TitledNode = serde_json::from_str(&body)?;
            let preference = title_preference(&lang, &title_type, server_title);
            println!("{}", select_title(&node, &preference));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.to_settings() {
        Ok(settings) => run(cli.command, &settings).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
