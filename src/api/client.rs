//! HTTP client for the media-catalog server
//!
//! Wraps `reqwest` with the headers the server expects and folds the
//! server's in-body error codes into the same error type as transport
//! failures, so callers handle a single error channel.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, REFERER};
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::Settings;

/// Endpoint used to check that the server is up
pub const VERSION_PATH: &str = "/api/version";

/// Header carrying the server API key
const API_KEY_HEADER: HeaderName = HeaderName::from_static("apikey");

/// Header required by the streaming endpoints
const API_VERSION_HEADER: HeaderName = HeaderName::from_static("api-version");

/// Errors that can occur when talking to the catalog server
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure, timeout or unreadable body
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body is not valid JSON
    #[error("Failed to parse JSON response: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A 200 response whose body carries an error `StatusCode`
    #[error("Server error {code} for {url}: {message}")]
    Server {
        url: String,
        code: u16,
        message: String,
    },
}

/// Client for the catalog server REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    api_key: Option<String>,
}

impl ApiClient {
    /// Creates a client using the timeout and API key from `settings`
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self::with_client(client, settings.api_key.clone()))
    }

    /// Creates a client around an existing `reqwest::Client`
    pub fn with_client(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    /// Replaces the API key, e.g. with one obtained from a fresh login
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// GETs `url` and returns the response body as text
    pub async fn get_data(&self, url: &str, referer: Option<&str>) -> Result<String, ApiError> {
        let headers = request_headers(url, self.api_key.as_deref(), referer);
        debug!(url, "GET");

        let response = self.client.get(url).headers(headers).send().await?;
        let body = read_body(url, response).await?;
        check_for_server_error(url, &body)?;

        Ok(body)
    }

    /// POSTs `body` as JSON to `url` and returns the response body as text
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<String, ApiError> {
        let headers = request_headers(url, self.api_key.as_deref(), None);
        debug!(url, "POST");

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;
        let text = read_body(url, response).await?;
        check_for_server_error(url, &text)?;

        Ok(text)
    }

    /// Whether the server at `base_url` answers its version endpoint.
    ///
    /// The request always goes to the network. Any successful, well-formed
    /// reply counts as connected, whatever the server's root path returns.
    pub async fn can_connect(&self, base_url: &str) -> bool {
        let url = format!("{}{}", base_url.trim_end_matches('/'), VERSION_PATH);
        match self.get_data(&url, None).await {
            Ok(_) => true,
            Err(e) => {
                debug!(url = %url, error = %e, "server unreachable");
                false
            }
        }
    }

    /// Polls [`can_connect`](Self::can_connect) until it succeeds or
    /// `attempts` retries have failed, sleeping `interval` before each retry.
    ///
    /// A server that is still starting answers 503 for a while; this gives it
    /// time to come up. With `attempts == 0` the server is checked once.
    pub async fn wait_for_server(&self, base_url: &str, attempts: u32, interval: Duration) -> bool {
        if self.can_connect(base_url).await {
            return true;
        }

        for attempt in 1..=attempts {
            sleep(interval).await;
            info!(attempt, attempts, "waiting for server startup");
            if self.can_connect(base_url).await {
                return true;
            }
        }

        false
    }
}

async fn read_body(url: &str, response: Response) -> Result<String, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.text().await?)
}

/// Builds the headers sent with every request to `url`
pub fn request_headers(url: &str, api_key: Option<&str>, referer: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(value) = api_key
        .filter(|key| !key.is_empty())
        .and_then(|key| HeaderValue::from_str(key).ok())
    {
        headers.insert(API_KEY_HEADER, value);
    }

    if let Some(value) = referer
        .filter(|r| r.len() > 1)
        .and_then(|r| HeaderValue::from_str(r).ok())
    {
        headers.insert(REFERER, value);
    }

    if url.contains("/Stream/") {
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static("1.0"));
    }

    headers
}

/// Checks a response body for an application-level error.
///
/// The server sometimes answers HTTP 200 with a JSON object whose
/// `StatusCode` field holds the real status. Anything other than `"200"` is
/// turned into [`ApiError::Server`]. Empty bodies are accepted; bodies that
/// are not JSON are rejected.
pub fn check_for_server_error(url: &str, body: &str) -> Result<(), ApiError> {
    if body.trim().is_empty() {
        return Ok(());
    }

    let parsed: Value = serde_json::from_str(body)?;
    let Some(code) = parsed.get("StatusCode") else {
        return Ok(());
    };

    let code = match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if code == "200" {
        return Ok(());
    }

    Err(ApiError::Server {
        url: url.to_string(),
        code: code.parse().unwrap_or(0),
        message: server_error_message(&code),
    })
}

/// Human-readable message for a server `StatusCode`
fn server_error_message(code: &str) -> String {
    match code {
        "500" => "Server Error".to_string(),
        "404" => "Invalid URL: Endpoint not Found in Server".to_string(),
        "503" => "Service Unavailable: Check netsh http".to_string(),
        "401" | "403" => "The connection was refused as unauthorized".to_string(),
        other => other.to_string(),
    }
}
