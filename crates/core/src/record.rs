//! The article record produced by ingestion.
//!
//! [`ArticleRecord`] is what the orchestrator hands to callers and what the
//! server persists. Derived fields are always computed from the final
//! `content`, so `word_count == 0` implies `reading_time_minutes == 0` and a
//! missing `content` implies a missing `excerpt`.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::Result;
use crate::derive::{excerpt, reading_time, word_count};

/// Field values resolved from extraction, before derivation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFields {
    /// Extracted title; blank titles fall back to the URL.
    pub title: Option<String>,
    pub author: Option<String>,
    /// Plain-text body.
    pub content: Option<String>,
    pub thumbnail_url: Option<String>,
    pub site_name: Option<String>,
}

/// Settings for the derived fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveConfig {
    pub words_per_minute: u32,
    pub excerpt_length: usize,
}

impl Default for DeriveConfig {
    fn default() -> Self {
        Self {
            words_per_minute: crate::derive::DEFAULT_WORDS_PER_MINUTE,
            excerpt_length: crate::derive::DEFAULT_EXCERPT_LENGTH,
        }
    }
}

/// A saved article.
///
/// Only `is_read` and `is_archived` change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Source URL as submitted.
    pub url: String,

    /// Never empty: the URL stands in when no title was found.
    pub title: String,

    pub author: Option<String>,

    /// Plain-text body with boilerplate removed.
    pub content: Option<String>,

    /// Word-boundary-safe preview of `content`.
    pub excerpt: Option<String>,

    /// Lead image URL.
    pub thumbnail_url: Option<String>,

    pub site_name: Option<String>,

    pub word_count: usize,

    pub reading_time_minutes: u32,

    pub is_read: bool,

    pub is_archived: bool,

    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ArticleRecord {
    /// The minimal record used when the page could not be fetched.
    ///
    /// Title is the URL, every optional field except `site_name` is `None`
    /// and both counters are zero.
    pub fn fallback(url: &str, site_name: Option<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            url: url.to_string(),
            title: url.to_string(),
            author: None,
            content: None,
            excerpt: None,
            thumbnail_url: None,
            site_name,
            word_count: 0,
            reading_time_minutes: 0,
            is_read: false,
            is_archived: false,
            saved_at: now,
            updated_at: now,
        }
    }

    /// Builds a record from resolved fields, deriving word count, reading time
    /// and excerpt from the final content.
    pub fn assemble(url: &str, fields: ResolvedFields, config: &DeriveConfig) -> Self {
        let content = fields.content.filter(|c| !c.trim().is_empty());
        let title = fields.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| url.to_string());

        let words = word_count(content.as_deref());
        let minutes = reading_time(words, config.words_per_minute);
        let excerpt = excerpt(content.as_deref(), config.excerpt_length);

        Self {
            title,
            author: fields.author,
            excerpt,
            thumbnail_url: fields.thumbnail_url,
            site_name: fields.site_name,
            word_count: words,
            reading_time_minutes: minutes,
            content,
            ..Self::fallback(url, None)
        }
    }

    /// Serializes the record as a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Human-readable rendering: a header block followed by the body text.
    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n{}\n", self.title, self.url);

        if let Some(author) = &self.author {
            out.push_str(&format!("By {author}\n"));
        }
        if let Some(site) = &self.site_name {
            out.push_str(&format!("Site: {site}\n"));
        }
        out.push_str(&format!("{} words, {} min read\n", self.word_count, self.reading_time_minutes));

        if let Some(content) = &self.content {
            out.push('\n');
            out.push_str(content);
            out.push('\n');
        }

        out
    }
}
