//! Error types for the ingestion pipeline.
//!
//! [`FetchError`] is the single failure type of the content fetcher. The
//! orchestrator recovers from it locally, so it never reaches callers of
//! [`Ingestor::ingest`](crate::Ingestor::ingest). [`StashError`] covers the
//! remaining fallible operations: reading local HTML, the heuristic body
//! extractor, and serialization.
//!
//! # Example
//!
//! ```rust
//! use stash_core::{StashError, Result};
//!
//! fn require_html(html: &str) -> Result<&str> {
//!     if html.trim().is_empty() {
//!         return Err(StashError::NoContent);
//!     }
//!     Ok(html)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Failure to retrieve a page.
///
/// Transport failures, timeouts and non-2xx responses all land here. Callers
/// only need to know that the fetch failed; the variants carry detail for
/// logging.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The server answered with a non-success status.
    #[error("Request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    /// The request exceeded the configured timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// DNS, TLS, connection and body decoding errors from reqwest.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Main error type for stash operations.
#[derive(Error, Debug)]
pub enum StashError {
    /// Fetching the page failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// An internal CSS selector or HTML fragment could not be parsed.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// No candidate reached the minimum readability score.
    ///
    /// Navigation pages, search results and near-empty pages end up here.
    #[error("Content is not readable (score {score} below threshold {threshold})")]
    NotReadable { score: f64, threshold: f64 },

    /// The document has no content candidates at all.
    #[error("No content could be extracted from the document")]
    NoContent,

    /// A local HTML file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Reading local HTML failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for StashError.
pub type Result<T> = std::result::Result<T, StashError>;
