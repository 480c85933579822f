//! Article Store: users and their saved articles.
//!
//! Every article belongs to exactly one user. `(user_id, url)` is unique, and
//! deleting a user removes all of its articles in the same operation.
//! Listing and search order by `saved_at` descending, newest id first on ties.

use async_trait::async_trait;
use serde::Serialize;
use stash_core::ArticleRecord;
use thiserror::Error;
use time::OffsetDateTime;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type UserId = i64;
pub type ArticleId = i64;

/// Default page size for list and search.
pub const DEFAULT_LIMIT: i64 = 50;

/// Largest accepted page size.
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Article already saved")]
    DuplicateArticle,

    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Failed to create connection pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

/// An [`ArticleRecord`] as persisted for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredArticle {
    pub id: ArticleId,
    #[serde(skip)]
    pub user_id: UserId,
    #[serde(flatten)]
    pub record: ArticleRecord,
}

/// Flag filters for listing; `None` matches both values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub is_read: Option<bool>,
    pub is_archived: Option<bool>,
}

impl ArticleFilter {
    pub fn matches(&self, record: &ArticleRecord) -> bool {
        self.is_read.is_none_or(|v| record.is_read == v) && self.is_archived.is_none_or(|v| record.is_archived == v)
    }
}

/// Partial update of the mutable article flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticleUpdate {
    pub is_read: Option<bool>,
    pub is_archived: Option<bool>,
}

impl ArticleUpdate {
    pub fn apply(&self, record: &mut ArticleRecord, now: OffsetDateTime) {
        if let Some(is_read) = self.is_read {
            record.is_read = is_read;
        }
        if let Some(is_archived) = self.is_archived {
            record.is_archived = is_archived;
        }
        record.updated_at = now;
    }
}

/// Limit/offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, offset: 0 }
    }
}

impl Page {
    /// Validated page; `None` when `limit` is outside `1..=100` or `offset` is negative.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Option<Self> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let offset = offset.unwrap_or(0);

        if !(1..=MAX_LIMIT).contains(&limit) || offset < 0 {
            return None;
        }

        Some(Self { limit, offset })
    }
}

/// One page of articles plus the number of matches across all pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticlePage {
    pub articles: Vec<StoredArticle>,
    pub total: i64,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with [`StoreError::DuplicateEmail`] if the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Deletes the user and every article it owns, atomically.
    async fn delete_user(&self, id: UserId) -> Result<(), StoreError>;

    /// Fails with [`StoreError::DuplicateArticle`] if the user already saved `record.url`.
    async fn insert_article(&self, user_id: UserId, record: ArticleRecord) -> Result<StoredArticle, StoreError>;

    async fn article_by_url(&self, user_id: UserId, url: &str) -> Result<Option<StoredArticle>, StoreError>;

    async fn get_article(&self, user_id: UserId, id: ArticleId) -> Result<Option<StoredArticle>, StoreError>;

    async fn list_articles(
        &self, user_id: UserId, filter: ArticleFilter, page: Page,
    ) -> Result<ArticlePage, StoreError>;

    /// Case-insensitive substring match on the title.
    async fn search_articles(&self, user_id: UserId, query: &str, page: Page) -> Result<ArticlePage, StoreError>;

    /// Applies `update` and bumps `updated_at`; `None` if the article is not the user's.
    async fn update_article(
        &self, user_id: UserId, id: ArticleId, update: ArticleUpdate,
    ) -> Result<Option<StoredArticle>, StoreError>;

    /// Returns whether an article was deleted.
    async fn delete_article(&self, user_id: UserId, id: ArticleId) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_validation() {
        assert_eq!(Page::new(None, None), Some(Page { limit: 50, offset: 0 }));
        assert_eq!(Page::new(Some(100), Some(10)), Some(Page { limit: 100, offset: 10 }));
        assert_eq!(Page::new(Some(0), None), None);
        assert_eq!(Page::new(Some(101), None), None);
        assert_eq!(Page::new(None, Some(-1)), None);
    }

    #[test]
    fn test_filter_matches() {
        let mut record = ArticleRecord::fallback("https://example.com", None);
        record.is_read = true;

        assert!(ArticleFilter::default().matches(&record));
        assert!(ArticleFilter { is_read: Some(true), is_archived: Some(false) }.matches(&record));
        assert!(!ArticleFilter { is_read: Some(false), ..Default::default() }.matches(&record));
    }

    #[test]
    fn test_update_bumps_timestamp() {
        let mut record = ArticleRecord::fallback("https://example.com", None);
        let later = record.updated_at + time::Duration::minutes(5);

        ArticleUpdate { is_archived: Some(true), ..Default::default() }.apply(&mut record, later);

        assert!(record.is_archived);
        assert!(!record.is_read);
        assert_eq!(record.updated_at, later);
        assert!(record.saved_at < record.updated_at);
    }

    #[test]
    fn test_stored_article_serializes_flat() {
        let article = StoredArticle { id: 7, user_id: 3, record: ArticleRecord::fallback("https://example.com", None) };
        let json = serde_json::to_value(&article).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["url"], "https://example.com");
        assert!(json.get("user_id").is_none());
        assert!(json.get("record").is_none());
    }
}
