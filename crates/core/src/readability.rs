//! Content extraction API.
//!
//! [`Extractor`] turns raw HTML into readable plain text plus page metadata.
//! Body text and metadata are extracted independently: either may be present
//! without the other. Extraction never fails; anything that cannot be
//! extracted comes back as `None`.
//!
//! # Example
//!
//! ```rust
//! use stash_core::Extractor;
//!
//! let html = "<html><head><title>Hello</title></head><body><p>Too short for a body.</p></body></html>";
//! let result = Extractor::new().extract(html, None);
//!
//! assert_eq!(result.title.as_deref(), Some("Hello"));
//! assert_eq!(result.text, None);
//! ```

use tracing::debug;
use url::Url;

use crate::extract::{ExtractConfig, extract_baseline, extract_content};
use crate::parse::Document;
use crate::preprocess::PreprocessConfig;
use crate::text::html_to_text;

/// Configuration for the [`Extractor`].
///
/// # Example
///
/// ```rust
/// use stash_core::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .min_score(25.0)
///     .include_tables(false)
///     .build();
/// assert!(!config.include_tables);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Minimum score the top candidate needs (default: 10.0).
    pub min_score: f64,

    /// Body text length below which the baseline extractor is also tried (default: 500).
    pub char_threshold: usize,

    /// Maximum elements to score (0 = internal cap, default: 0).
    pub max_elems_to_parse: usize,

    /// Whether to unwrap unlikely candidates before scoring (default: true).
    pub remove_unlikely: bool,

    /// Whether tables are part of the extracted text (default: true).
    pub include_tables: bool,

    /// Minimum paragraph text for the baseline extractor (default: 100).
    pub min_baseline_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_score: 10.0,
            char_threshold: 500,
            max_elems_to_parse: 0,
            remove_unlikely: true,
            include_tables: true,
            min_baseline_chars: 100,
        }
    }
}

impl ExtractorConfig {
    /// Creates a new builder for ExtractorConfig.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder::new()
    }

    fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            min_score_threshold: self.min_score,
            char_threshold: self.char_threshold,
            max_elements: self.max_elems_to_parse,
            min_baseline_chars: self.min_baseline_chars,
            ..Default::default()
        }
    }
}

/// Builder for ExtractorConfig.
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ExtractorConfig::default() }
    }

    /// Sets the minimum score threshold.
    pub fn min_score(mut self, value: f64) -> Self {
        self.config.min_score = value;
        self
    }

    /// Sets the character threshold.
    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    /// Sets the maximum elements to parse.
    pub fn max_elems_to_parse(mut self, value: usize) -> Self {
        self.config.max_elems_to_parse = value;
        self
    }

    /// Sets whether to remove unlikely candidates.
    pub fn remove_unlikely(mut self, value: bool) -> Self {
        self.config.remove_unlikely = value;
        self
    }

    /// Sets whether tables are included in the text.
    pub fn include_tables(mut self, value: bool) -> Self {
        self.config.include_tables = value;
        self
    }

    /// Sets the baseline extractor's minimum text length.
    pub fn min_baseline_chars(mut self, value: usize) -> Self {
        self.config.min_baseline_chars = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ExtractorConfig {
        self.config
    }
}

impl Default for ExtractorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Text and metadata extracted from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Plain-text article body.
    pub text: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    /// Absolute URL of the lead image.
    pub lead_image: Option<String>,
    pub site_name: Option<String>,
}

/// Heuristic article extractor.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    /// Creates an extractor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extracts body text and metadata from `html`.
    ///
    /// `base_url` resolves relative links such as the lead image. Malformed or
    /// partial HTML yields `None` fields, never an error.
    pub fn extract(&self, html: &str, base_url: Option<&Url>) -> ExtractionResult {
        let metadata = Document::parse(html).with_base_url(base_url.cloned()).extract_metadata();
        let text = self.extract_text(html, base_url);

        ExtractionResult {
            text,
            title: metadata.title,
            author: metadata.author,
            lead_image: metadata.image,
            site_name: metadata.site_name,
        }
    }

    /// Extracts only the plain-text body.
    ///
    /// The scoring heuristic runs first. When it rejects the page, or finds
    /// less than `char_threshold` characters, the baseline paragraph collector
    /// runs too and the longer text wins.
    pub fn extract_text(&self, html: &str, base_url: Option<&Url>) -> Option<String> {
        let preprocess = PreprocessConfig {
            remove_unlikely: self.config.remove_unlikely,
            include_tables: self.config.include_tables,
            base_url: base_url.cloned(),
            ..Default::default()
        };
        let doc = Document::parse_with_preprocessing(html, &preprocess);
        let config = self.config.extract_config();

        let heuristic = match extract_content(&doc, &config) {
            Ok(extracted) => non_empty(html_to_text(&extracted.content)),
            Err(err) => {
                debug!(error = %err, "heuristic extraction rejected the page");
                None
            }
        };

        let heuristic_len = heuristic.as_ref().map_or(0, |text| text.chars().count());
        if heuristic_len >= self.config.char_threshold {
            return heuristic;
        }

        let baseline = extract_baseline(&doc, &config)
            .ok()
            .and_then(|extracted| non_empty(html_to_text(&extracted.content)));

        match baseline {
            Some(text) if text.chars().count() > heuristic_len => {
                debug!(chars = text.chars().count(), "using baseline extraction");
                Some(text)
            }
            _ => heuristic,
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}
