//! Content fetching from URLs, files, and stdin.
//!
//! The [`Fetch`] trait is the seam between the orchestrator and the network.
//! [`HttpFetcher`] is the production implementation: one GET per call, redirects
//! followed, bounded timeout, no retries.

use std::fs;
use std::path::PathBuf;
#[cfg(feature = "fetch")]
use std::time::Duration;

#[cfg(feature = "fetch")]
use reqwest::{
    Client,
    header::{ACCEPT, ACCEPT_LANGUAGE},
    redirect::Policy,
};
use url::Url;

use crate::{FetchError, Result, StashError};

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; Stash/0.1; read-it-later article fetcher)".to_string(),
            max_redirects: 10,
        }
    }
}

/// Retrieves the raw HTML of a page.
///
/// Implementations collapse every failure into [`FetchError`] and make a single
/// attempt per call.
pub trait Fetch: Send + Sync {
    /// Fetches `url` and returns the response body as text.
    fn fetch(&self, url: &str) -> impl Future<Output = std::result::Result<String, FetchError>> + Send;
}

/// Parses `url` and checks that it is an absolute http(s) URL.
///
/// # Example
///
/// ```rust
/// use stash_core::validate_url;
///
/// assert!(validate_url("https://example.com/post").is_ok());
/// assert!(validate_url("ftp://example.com/file").is_err());
/// assert!(validate_url("example.com").is_err());
/// ```
pub fn validate_url(url: &str) -> std::result::Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme '{}' (expected http or https)",
                other
            )));
        }
    }

    if parsed.host_str().is_none() {
        return Err(FetchError::InvalidUrl(format!("{}: missing host", url)));
    }

    Ok(parsed)
}

/// Fetcher backed by a shared reqwest client.
///
/// The client is built once so connections are pooled across ingestion calls;
/// each response is consumed inside [`Fetch::fetch`], which releases the
/// connection on every exit path.
#[cfg(feature = "fetch")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: u64,
}

#[cfg(feature = "fetch")]
impl HttpFetcher {
    /// Builds the underlying client from `config`.
    pub fn new(config: &FetchConfig) -> std::result::Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .redirect(Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client, timeout: config.timeout })
    }

    fn map_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() { FetchError::Timeout { timeout: self.timeout } } else { FetchError::Http(err) }
    }
}

#[cfg(feature = "fetch")]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let parsed_url = validate_url(url)?;

        let response = self
            .client
            .get(parsed_url)
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16(), url: response.url().to_string() });
        }

        response.text().await.map_err(|e| self.map_error(e))
    }
}

/// Reads HTML content from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(StashError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(StashError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    Ok(buffer)
}
