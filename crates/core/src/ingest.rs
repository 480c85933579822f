//! Ingestion orchestrator: URL in, [`ArticleRecord`] out.
//!
//! [`Ingestor::ingest`] never fails. A failed fetch produces the fallback
//! record (title is the URL, no content) and extraction that finds nothing
//! simply leaves fields empty. Persistence is the caller's job.
//!
//! # Example
//!
//! ```rust
//! use stash_core::{IngestConfig, Ingestor};
//! use stash_core::fetch::Fetch;
//! use stash_core::FetchError;
//!
//! struct Offline;
//!
//! impl Fetch for Offline {
//!     async fn fetch(&self, url: &str) -> Result<String, FetchError> {
//!         Err(FetchError::InvalidUrl(url.to_string()))
//!     }
//! }
//!
//! # tokio_test_block_on(async {
//! let ingestor = Ingestor::with_fetcher(IngestConfig::default(), Offline);
//! let record = ingestor.ingest("https://www.example.com/post").await;
//! assert_eq!(record.title, "https://www.example.com/post");
//! assert_eq!(record.site_name.as_deref(), Some("example.com"));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use tracing::{debug, warn};
use url::Url;

use crate::derive::{DEFAULT_EXCERPT_LENGTH, DEFAULT_WORDS_PER_MINUTE};
use crate::fetch::{Fetch, FetchConfig};
use crate::readability::{Extractor, ExtractorConfig};
use crate::record::{ArticleRecord, DeriveConfig, ResolvedFields};

#[cfg(feature = "fetch")]
use crate::fetch::HttpFetcher;

/// Configuration for the whole pipeline.
///
/// Built once at startup and passed to [`Ingestor`].
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub fetch: FetchConfig,
    pub extract: ExtractorConfig,
    /// Reading speed for `reading_time_minutes` (default: 200).
    pub words_per_minute: u32,
    /// Maximum excerpt length in characters (default: 300).
    pub excerpt_length: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            extract: ExtractorConfig::default(),
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
        }
    }
}

impl IngestConfig {
    /// Creates a new builder for IngestConfig.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::new()
    }

    fn derive_config(&self) -> DeriveConfig {
        DeriveConfig { words_per_minute: self.words_per_minute, excerpt_length: self.excerpt_length }
    }
}

/// Builder for IngestConfig.
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn new() -> Self {
        Self { config: IngestConfig::default() }
    }

    /// Sets the request timeout in seconds.
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.fetch.timeout = seconds;
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.fetch.user_agent = user_agent.into();
        self
    }

    pub fn fetch_config(mut self, fetch: FetchConfig) -> Self {
        self.config.fetch = fetch;
        self
    }

    pub fn extractor_config(mut self, extract: ExtractorConfig) -> Self {
        self.config.extract = extract;
        self
    }

    pub fn words_per_minute(mut self, value: u32) -> Self {
        self.config.words_per_minute = value;
        self
    }

    pub fn excerpt_length(mut self, value: usize) -> Self {
        self.config.excerpt_length = value;
        self
    }

    pub fn build(self) -> IngestConfig {
        self.config
    }
}

impl Default for IngestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Host of `url` without a leading `www.` label.
///
/// Returns `None` when the URL does not parse or has no host.
///
/// ```rust
/// use stash_core::site_name_from_url;
///
/// assert_eq!(site_name_from_url("https://www.example.com/a").as_deref(), Some("example.com"));
/// assert_eq!(site_name_from_url("https://blog.example.org").as_deref(), Some("blog.example.org"));
/// assert_eq!(site_name_from_url("not a url"), None);
/// ```
pub fn site_name_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    if host.is_empty() { None } else { Some(host.to_string()) }
}

/// Composes fetching, extraction and derivation.
#[derive(Debug, Clone)]
pub struct Ingestor<F> {
    config: IngestConfig,
    extractor: Extractor,
    fetcher: F,
}

#[cfg(feature = "fetch")]
impl Ingestor<HttpFetcher> {
    /// Creates an ingestor that fetches over HTTP.
    pub fn new(config: IngestConfig) -> crate::Result<Self> {
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Ok(Self::with_fetcher(config, fetcher))
    }
}

impl<F: Fetch> Ingestor<F> {
    /// Creates an ingestor around any [`Fetch`] implementation.
    pub fn with_fetcher(config: IngestConfig, fetcher: F) -> Self {
        let extractor = Extractor::with_config(config.extract.clone());
        Self { config, extractor, fetcher }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Fetches `url` and builds its record.
    ///
    /// Makes exactly one fetch attempt. Any fetch failure yields
    /// [`ArticleRecord::fallback`] with the host-derived site name.
    pub async fn ingest(&self, url: &str) -> ArticleRecord {
        match self.fetcher.fetch(url).await {
            Ok(html) => self.ingest_html(url, &html),
            Err(err) => {
                warn!(url, error = %err, "fetch failed, saving without content");
                ArticleRecord::fallback(url, site_name_from_url(url))
            }
        }
    }

    /// Builds a record from HTML that was already retrieved.
    ///
    /// Extracted values take precedence; the title falls back to the URL and
    /// the site name to the URL's host.
    pub fn ingest_html(&self, url: &str, html: &str) -> ArticleRecord {
        let base_url = Url::parse(url).ok();
        let extracted = self.extractor.extract(html, base_url.as_ref());

        debug!(
            url,
            has_title = extracted.title.is_some(),
            has_text = extracted.text.is_some(),
            "extraction finished"
        );

        let fields = ResolvedFields {
            title: extracted.title,
            author: extracted.author,
            content: extracted.text,
            thumbnail_url: extracted.lead_image,
            site_name: extracted.site_name.or_else(|| site_name_from_url(url)),
        };

        ArticleRecord::assemble(url, fields, &self.config.derive_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FetchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        body: Option<String>,
    }

    impl Fetch for Counting {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body.clone().ok_or_else(|| FetchError::Status { status: 503, url: url.to_string() })
        }
    }

    #[test]
    fn test_ingest_config_builder() {
        let config = IngestConfig::builder()
            .timeout(5)
            .user_agent("test-agent")
            .words_per_minute(100)
            .excerpt_length(50)
            .extractor_config(ExtractorConfig::builder().include_tables(false).build())
            .build();

        assert_eq!(config.fetch.timeout, 5);
        assert_eq!(config.fetch.user_agent, "test-agent");
        assert_eq!(config.words_per_minute, 100);
        assert_eq!(config.excerpt_length, 50);
        assert!(!config.extract.include_tables);
    }

    #[test]
    fn test_site_name_from_url() {
        assert_eq!(site_name_from_url("https://www.nytimes.com/2024/a.html").as_deref(), Some("nytimes.com"));
        assert_eq!(site_name_from_url("http://example.com:8080/").as_deref(), Some("example.com"));
        assert_eq!(site_name_from_url("https://wwwexample.com").as_deref(), Some("wwwexample.com"));
        assert_eq!(site_name_from_url("mailto:someone@example.com"), None);
        assert_eq!(site_name_from_url(""), None);
    }

    #[tokio::test]
    async fn test_single_fetch_attempt_on_failure() {
        let fetcher = Counting { calls: AtomicUsize::new(0), body: None };
        let ingestor = Ingestor::with_fetcher(IngestConfig::default(), fetcher);

        let record = ingestor.ingest("https://www.example.com/down").await;

        assert_eq!(ingestor.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(record.title, "https://www.example.com/down");
        assert_eq!(record.site_name.as_deref(), Some("example.com"));
        assert_eq!(record.content, None);
    }

    #[tokio::test]
    async fn test_extracted_site_name_wins() {
        let html = r#"<html><head><meta property="og:site_name" content="The Example Times"></head><body></body></html>"#;
        let fetcher = Counting { calls: AtomicUsize::new(0), body: Some(html.to_string()) };
        let ingestor = Ingestor::with_fetcher(IngestConfig::default(), fetcher);

        let record = ingestor.ingest("https://www.example.com/a").await;

        assert_eq!(ingestor.fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(record.site_name.as_deref(), Some("The Example Times"));
        assert_eq!(record.title, "https://www.example.com/a");
    }

    #[test]
    fn test_ingest_html_resolves_relative_thumbnail() {
        let html = r#"<html><head><title>Post</title><meta property="og:image" content="/cover.jpg"></head></html>"#;
        let ingestor = Ingestor::with_fetcher(
            IngestConfig::default(),
            Counting { calls: AtomicUsize::new(0), body: None },
        );

        let record = ingestor.ingest_html("https://example.com/posts/1", html);

        assert_eq!(record.title, "Post");
        assert_eq!(record.thumbnail_url.as_deref(), Some("https://example.com/cover.jpg"));
        assert_eq!(record.site_name.as_deref(), Some("example.com"));
    }
}
