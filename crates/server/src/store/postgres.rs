use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use stash_core::ArticleRecord;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};
use tracing::info;

use super::{
    ArticleFilter, ArticleId, ArticlePage, ArticleUpdate, Page, Store, StoreError, StoredArticle, User, UserId,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS articles (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    author TEXT,
    content TEXT,
    excerpt TEXT,
    thumbnail_url TEXT,
    site_name TEXT,
    reading_time_minutes INTEGER NOT NULL DEFAULT 0,
    word_count INTEGER NOT NULL DEFAULT 0,
    is_read BOOLEAN NOT NULL DEFAULT FALSE,
    is_archived BOOLEAN NOT NULL DEFAULT FALSE,
    saved_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (user_id, url)
);

CREATE INDEX IF NOT EXISTS articles_user_saved_at_idx ON articles (user_id, saved_at DESC, id DESC);
"#;

const ARTICLE_COLUMNS: &str = "id, user_id, url, title, author, content, excerpt, thumbnail_url, site_name, \
     reading_time_minutes, word_count, is_read, is_archived, saved_at, updated_at";

/// Postgres-backed store over a `deadpool-postgres` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Connects to `database_url` and creates the schema if it is missing.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let mut config = Config::new();
        config.url = Some(database_url.to_string());
        config.manager = Some(ManagerConfig { recycling_method: RecyclingMethod::Fast });

        let pool = config.create_pool(Some(Runtime::Tokio1), NoTls)?;
        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await?;
        info!("database schema ready");
        Ok(())
    }

    async fn query_page(
        &self, where_clause: &str, params: &[&(dyn tokio_postgres::types::ToSql + Sync)], page: Page,
    ) -> Result<ArticlePage, StoreError> {
        let client = self.pool.get().await?;

        let count_sql = format!("SELECT count(*) FROM articles WHERE {where_clause}");
        let total: i64 = client.query_one(&count_sql, params).await?.try_get(0)?;

        let next = params.len();
        let page_sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE {where_clause} \
             ORDER BY saved_at DESC, id DESC LIMIT ${} OFFSET ${}",
            next + 1,
            next + 2
        );
        let mut page_params = params.to_vec();
        page_params.push(&page.limit);
        page_params.push(&page.offset);

        let rows = client.query(&page_sql, &page_params).await?;
        let articles = rows.iter().map(article_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(ArticlePage { articles, total })
    }
}

fn user_from_row(row: &Row) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

fn article_from_row(row: &Row) -> Result<StoredArticle, StoreError> {
    let word_count: i32 = row.try_get("word_count")?;
    let reading_time: i32 = row.try_get("reading_time_minutes")?;

    Ok(StoredArticle {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        record: ArticleRecord {
            url: row.try_get("url")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            content: row.try_get("content")?,
            excerpt: row.try_get("excerpt")?,
            thumbnail_url: row.try_get("thumbnail_url")?,
            site_name: row.try_get("site_name")?,
            word_count: usize::try_from(word_count).unwrap_or(0),
            reading_time_minutes: u32::try_from(reading_time).unwrap_or(0),
            is_read: row.try_get("is_read")?,
            is_archived: row.try_get("is_archived")?,
            saved_at: row.try_get("saved_at")?,
            updated_at: row.try_get("updated_at")?,
        },
    })
}

fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

/// Escapes `%`, `_` and `\` so `query` matches literally inside ILIKE.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO users (email, password_hash) VALUES ($1, $2) \
                 RETURNING id, email, password_hash, created_at",
                &[&email, &password_hash],
            )
            .await
            .map_err(|e| if is_unique_violation(&e) { StoreError::DuplicateEmail } else { e.into() })?;

        user_from_row(&row)
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT id, email, password_hash, created_at FROM users WHERE email = $1", &[&email])
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT id, email, password_hash, created_at FROM users WHERE id = $1", &[&id])
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        tx.execute("DELETE FROM articles WHERE user_id = $1", &[&id]).await?;
        let deleted = tx.execute("DELETE FROM users WHERE id = $1", &[&id]).await?;
        if deleted == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_article(&self, user_id: UserId, record: ArticleRecord) -> Result<StoredArticle, StoreError> {
        let client = self.pool.get().await?;
        let word_count = i32::try_from(record.word_count).unwrap_or(i32::MAX);
        let reading_time = i32::try_from(record.reading_time_minutes).unwrap_or(i32::MAX);

        let sql = format!(
            "INSERT INTO articles (user_id, url, title, author, content, excerpt, thumbnail_url, site_name, \
             reading_time_minutes, word_count, is_read, is_archived, saved_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = client
            .query_one(
                &sql,
                &[
                    &user_id,
                    &record.url,
                    &record.title,
                    &record.author,
                    &record.content,
                    &record.excerpt,
                    &record.thumbnail_url,
                    &record.site_name,
                    &reading_time,
                    &word_count,
                    &record.is_read,
                    &record.is_archived,
                    &record.saved_at,
                    &record.updated_at,
                ],
            )
            .await
            .map_err(|e| if is_unique_violation(&e) { StoreError::DuplicateArticle } else { e.into() })?;

        article_from_row(&row)
    }

    async fn article_by_url(&self, user_id: UserId, url: &str) -> Result<Option<StoredArticle>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE user_id = $1 AND url = $2");
        let row = client.query_opt(&sql, &[&user_id, &url]).await?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn get_article(&self, user_id: UserId, id: ArticleId) -> Result<Option<StoredArticle>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1 AND user_id = $2");
        let row = client.query_opt(&sql, &[&id, &user_id]).await?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn list_articles(
        &self, user_id: UserId, filter: ArticleFilter, page: Page,
    ) -> Result<ArticlePage, StoreError> {
        self.query_page(
            "user_id = $1 AND ($2::BOOLEAN IS NULL OR is_read = $2) AND ($3::BOOLEAN IS NULL OR is_archived = $3)",
            &[&user_id, &filter.is_read, &filter.is_archived],
            page,
        )
        .await
    }

    async fn search_articles(&self, user_id: UserId, query: &str, page: Page) -> Result<ArticlePage, StoreError> {
        let pattern = like_pattern(query);
        self.query_page("user_id = $1 AND title ILIKE $2", &[&user_id, &pattern], page).await
    }

    async fn update_article(
        &self, user_id: UserId, id: ArticleId, update: ArticleUpdate,
    ) -> Result<Option<StoredArticle>, StoreError> {
        let client = self.pool.get().await?;
        let sql = format!(
            "UPDATE articles SET is_read = COALESCE($3, is_read), is_archived = COALESCE($4, is_archived), \
             updated_at = now() WHERE id = $1 AND user_id = $2 RETURNING {ARTICLE_COLUMNS}"
        );
        let row = client.query_opt(&sql, &[&id, &user_id, &update.is_read, &update.is_archived]).await?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn delete_article(&self, user_id: UserId, id: ArticleId) -> Result<bool, StoreError> {
        let client = self.pool.get().await?;
        let deleted = client.execute("DELETE FROM articles WHERE id = $1 AND user_id = $2", &[&id, &user_id]).await?;
        Ok(deleted > 0)
    }
}
