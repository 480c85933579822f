use std::collections::BTreeMap;

use async_trait::async_trait;
use stash_core::ArticleRecord;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{
    ArticleFilter, ArticleId, ArticlePage, ArticleUpdate, Page, Store, StoreError, StoredArticle, User, UserId,
};

#[derive(Debug, Default)]
struct Tables {
    last_user_id: UserId,
    last_article_id: ArticleId,
    users: BTreeMap<UserId, User>,
    articles: BTreeMap<ArticleId, StoredArticle>,
}

fn paginate<'a>(matches: impl Iterator<Item = &'a StoredArticle>, page: Page) -> ArticlePage {
    let mut found: Vec<&StoredArticle> = matches.collect();
    found.sort_by(|a, b| b.record.saved_at.cmp(&a.record.saved_at).then(b.id.cmp(&a.id)));

    let total = found.len() as i64;
    let articles = found
        .into_iter()
        .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit).unwrap_or(0))
        .cloned()
        .collect();

    ArticlePage { articles, total }
}

/// Process-local store, used when no database is configured and in tests.
///
/// All writes take the write lock, so uniqueness checks and inserts are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }

        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        if tables.users.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        tables.articles.retain(|_, article| article.user_id != id);

        Ok(())
    }

    async fn insert_article(&self, user_id: UserId, record: ArticleRecord) -> Result<StoredArticle, StoreError> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::NotFound);
        }
        if tables.articles.values().any(|a| a.user_id == user_id && a.record.url == record.url) {
            return Err(StoreError::DuplicateArticle);
        }

        tables.last_article_id += 1;
        let article = StoredArticle { id: tables.last_article_id, user_id, record };
        tables.articles.insert(article.id, article.clone());

        Ok(article)
    }

    async fn article_by_url(&self, user_id: UserId, url: &str) -> Result<Option<StoredArticle>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.articles.values().find(|a| a.user_id == user_id && a.record.url == url).cloned())
    }

    async fn get_article(&self, user_id: UserId, id: ArticleId) -> Result<Option<StoredArticle>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.articles.get(&id).filter(|a| a.user_id == user_id).cloned())
    }

    async fn list_articles(
        &self, user_id: UserId, filter: ArticleFilter, page: Page,
    ) -> Result<ArticlePage, StoreError> {
        let tables = self.tables.read().await;
        let matches = tables.articles.values().filter(|a| a.user_id == user_id && filter.matches(&a.record));
        Ok(paginate(matches, page))
    }

    async fn search_articles(&self, user_id: UserId, query: &str, page: Page) -> Result<ArticlePage, StoreError> {
        let needle = query.to_lowercase();
        let tables = self.tables.read().await;
        let matches = tables
            .articles
            .values()
            .filter(|a| a.user_id == user_id && a.record.title.to_lowercase().contains(&needle));
        Ok(paginate(matches, page))
    }

    async fn update_article(
        &self, user_id: UserId, id: ArticleId, update: ArticleUpdate,
    ) -> Result<Option<StoredArticle>, StoreError> {
        let mut tables = self.tables.write().await;

        let Some(article) = tables.articles.get_mut(&id).filter(|a| a.user_id == user_id) else {
            return Ok(None);
        };
        update.apply(&mut article.record, OffsetDateTime::now_utc());

        Ok(Some(article.clone()))
    }

    async fn delete_article(&self, user_id: UserId, id: ArticleId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.articles.get(&id).is_some_and(|a| a.user_id == user_id) {
            tables.articles.remove(&id);
            return Ok(true);
        }

        Ok(false)
    }
}
