pub mod derive;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ingest;
pub mod metadata;
pub mod parse;
pub mod postprocess;
pub mod preprocess;
pub mod readability;
pub mod record;
pub mod scoring;
pub mod text;

pub use derive::{excerpt, reading_time, word_count};
pub use error::{FetchError, Result, StashError};
#[doc(hidden)]
pub use extract::{ExtractConfig, ExtractedContent};
pub use extract::{extract_baseline, extract_content};
#[cfg(feature = "fetch")]
pub use fetch::HttpFetcher;
pub use fetch::{Fetch, FetchConfig, fetch_file, fetch_stdin, validate_url};
pub use ingest::{IngestConfig, IngestConfigBuilder, Ingestor, site_name_from_url};
pub use metadata::Metadata;
pub use parse::{Document, Element};
#[doc(hidden)]
pub use postprocess::PostProcessConfig;
pub use postprocess::postprocess_html;
#[doc(hidden)]
pub use preprocess::PreprocessConfig;
pub use preprocess::preprocess_html;
pub use readability::{ExtractionResult, Extractor, ExtractorConfig, ExtractorConfigBuilder};
pub use record::{ArticleRecord, DeriveConfig, ResolvedFields};
#[doc(hidden)]
pub use scoring::{
    ScoreConfig, ScoreResult, base_tag_score, calculate_score, class_id_weight, content_density_score, link_density,
};
pub use text::html_to_text;
