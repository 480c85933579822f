//! Behaviour shared by every `Store` backend.
//!
//! The in-memory store always runs. The Postgres store runs with
//! `cargo test -- --ignored` when `STASH_TEST_DATABASE_URL` points at a
//! scratch database.

use stash_core::ArticleRecord;
use stash_server::store::{ArticleFilter, ArticleUpdate, Page};
use stash_server::{MemoryStore, PgStore, Store, StoreError};
use time::OffsetDateTime;

/// An email no earlier run against the same database has used.
fn unique_email(name: &str) -> String {
    format!("{name}+{}@example.com", OffsetDateTime::now_utc().unix_timestamp_nanos())
}

fn record(url: &str, title: &str) -> ArticleRecord {
    let mut record = ArticleRecord::fallback(url, Some("example.com".to_string()));
    record.title = title.to_string();
    record
}

async fn check_store(store: &dyn Store) {
    let reader = store.create_user(&unique_email("reader"), "hash").await.unwrap();
    let other = store.create_user(&unique_email("other"), "hash").await.unwrap();

    assert!(matches!(store.create_user(&reader.email, "hash").await, Err(StoreError::DuplicateEmail)));
    assert_eq!(store.user_by_email(&reader.email).await.unwrap().map(|u| u.id), Some(reader.id));

    let tide = store.insert_article(reader.id, record("https://example.com/tide", "Tide Pools")).await.unwrap();
    let moss = store.insert_article(reader.id, record("https://example.com/moss", "Moss 100%")).await.unwrap();
    store.insert_article(other.id, record("https://example.com/tide", "Tide Pools")).await.unwrap();

    let duplicate = store.insert_article(reader.id, record("https://example.com/tide", "Again")).await;
    assert!(matches!(duplicate, Err(StoreError::DuplicateArticle)));

    let unread = store.update_article(reader.id, tide.id, ArticleUpdate::default()).await.unwrap().unwrap();
    assert!(!unread.record.is_read && !unread.record.is_archived);

    let read = ArticleUpdate { is_read: Some(true), ..Default::default() };
    let updated = store.update_article(reader.id, tide.id, read).await.unwrap().unwrap();
    assert!(updated.record.is_read);
    assert!(!updated.record.is_archived, "unset flags are left alone");

    assert_eq!(store.update_article(other.id, tide.id, read).await.unwrap(), None);
    assert_eq!(store.get_article(other.id, tide.id).await.unwrap(), None);

    let all = store.list_articles(reader.id, ArticleFilter::default(), Page::default()).await.unwrap();
    assert_eq!(all.total, 2);
    assert_eq!(all.articles.iter().map(|a| a.id).collect::<Vec<_>>(), [moss.id, tide.id]);

    let read_only = ArticleFilter { is_read: Some(true), ..Default::default() };
    let page = store.list_articles(reader.id, read_only, Page::default()).await.unwrap();
    assert_eq!(page.articles.iter().map(|a| a.id).collect::<Vec<_>>(), [tide.id]);

    let unread_unarchived = ArticleFilter { is_read: Some(false), is_archived: Some(false) };
    let page = store.list_articles(reader.id, unread_unarchived, Page::default()).await.unwrap();
    assert_eq!(page.articles.iter().map(|a| a.id).collect::<Vec<_>>(), [moss.id]);

    let second = Page::new(Some(1), Some(1)).unwrap();
    let page = store.list_articles(reader.id, ArticleFilter::default(), second).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.articles.iter().map(|a| a.id).collect::<Vec<_>>(), [tide.id]);

    let found = store.search_articles(reader.id, "tide", Page::default()).await.unwrap();
    assert_eq!(found.articles.iter().map(|a| a.id).collect::<Vec<_>>(), [tide.id]);
    let literal = store.search_articles(reader.id, "100%", Page::default()).await.unwrap();
    assert_eq!(literal.total, 1);
    let wildcard = store.search_articles(reader.id, "%", Page::default()).await.unwrap();
    assert_eq!(wildcard.articles.iter().map(|a| a.id).collect::<Vec<_>>(), [moss.id]);

    assert!(store.delete_article(reader.id, moss.id).await.unwrap());
    assert!(!store.delete_article(reader.id, moss.id).await.unwrap());

    store.delete_user(reader.id).await.unwrap();
    assert_eq!(store.user_by_id(reader.id).await.unwrap(), None);
    assert_eq!(store.get_article(reader.id, tide.id).await.unwrap(), None);
    assert!(matches!(store.delete_user(reader.id).await, Err(StoreError::NotFound)));

    let survivors = store.list_articles(other.id, ArticleFilter::default(), Page::default()).await.unwrap();
    assert_eq!(survivors.total, 1);

    store.delete_user(other.id).await.unwrap();
}

#[tokio::test]
async fn test_memory_store() {
    check_store(&MemoryStore::new()).await;
}

#[tokio::test]
#[ignore = "needs STASH_TEST_DATABASE_URL"]
async fn test_postgres_store() {
    let url = std::env::var("STASH_TEST_DATABASE_URL").expect("STASH_TEST_DATABASE_URL must be set");
    let store = PgStore::connect(&url).await.unwrap();
    check_store(&store).await;
}
