//! Route table and handlers.

use async_trait::async_trait;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use stash_core::{ArticleRecord, Fetch, Ingestor, validate_url};
use time::OffsetDateTime;
use tracing::info;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::store::{ArticleFilter, ArticleId, ArticlePage, ArticleUpdate, Page, StoredArticle, UserId};

/// Produces the record for a URL being saved.
///
/// Implemented for [`Ingestor`]; tests substitute canned records.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch_article(&self, url: &str) -> ArticleRecord;
}

#[async_trait]
impl<F: Fetch + 'static> ArticleSource for Ingestor<F> {
    async fn fetch_article(&self, url: &str) -> ArticleRecord {
        self.ingest(url).await
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me).delete(delete_me))
        .route("/api/articles", get(list_articles).post(create_article))
        .route("/api/articles/search", get(search_articles))
        .route("/api/articles/{id}", get(get_article).patch(update_article).delete(delete_article))
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl TokenResponse {
    fn bearer(access_token: String) -> Self {
        Self { access_token, token_type: "bearer" }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct NewArticle {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticleFlags {
    pub is_read: Option<bool>,
    pub is_archived: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub is_read: Option<bool>,
    pub is_archived: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Checks the shape of an email address and lowercases its domain.
fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim();
    let (local, domain) = email.split_once('@')?;

    let valid = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);

    valid.then(|| format!("{local}@{}", domain.to_lowercase()))
}

fn page(limit: Option<i64>, offset: Option<i64>) -> Result<Page, ApiError> {
    Page::new(limit, offset).ok_or_else(|| {
        ApiError::Unprocessable("limit must be between 1 and 100 and offset must not be negative".to_string())
    })
}

async fn hash_password(state: &AppState, password: String) -> Result<String, ApiError> {
    let hasher = state.passwords;
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))
}

async fn verify_password(state: &AppState, password: String, encoded: String) -> Result<bool, ApiError> {
    let hasher = state.passwords;
    tokio::task::spawn_blocking(move || hasher.verify(&password, &encoded))
        .await
        .map_err(|e| ApiError::Internal(format!("password verification task failed: {e}")))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn signup(
    State(state): State<AppState>, payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let Json(credentials) = payload?;

    let email = normalize_email(&credentials.email)
        .ok_or_else(|| ApiError::Unprocessable("Invalid email address".to_string()))?;
    if credentials.password.is_empty() {
        return Err(ApiError::Unprocessable("Password must not be empty".to_string()));
    }

    if state.store.user_by_email(&email).await?.is_some() {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }

    let password_hash = hash_password(&state, credentials.password).await?;
    let user = state.store.create_user(&email, &password_hash).await?;
    info!(user_id = user.id, "user signed up");

    let token = state.tokens.issue(user.id)?;
    Ok((StatusCode::CREATED, Json(TokenResponse::bearer(token))))
}

async fn login(
    State(state): State<AppState>, payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(credentials) = payload?;
    let email = normalize_email(&credentials.email)
        .ok_or_else(|| ApiError::Unprocessable("Invalid email address".to_string()))?;

    let rejected = || ApiError::Unauthorized("Invalid email or password".to_string());
    let user = state.store.user_by_email(&email).await?.ok_or_else(rejected)?;
    if !verify_password(&state, credentials.password, user.password_hash).await? {
        return Err(rejected());
    }

    Ok(Json(TokenResponse::bearer(state.tokens.issue(user.id)?)))
}

async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse { id: user.id, email: user.email, created_at: user.created_at })
}

async fn delete_me(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<StatusCode, ApiError> {
    state.store.delete_user(user.id).await?;
    info!(user_id = user.id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn create_article(
    State(state): State<AppState>, AuthUser(user): AuthUser, payload: Result<Json<NewArticle>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredArticle>), ApiError> {
    let Json(new) = payload?;
    let url = validate_url(new.url.trim()).map_err(|e| ApiError::Unprocessable(e.to_string()))?.to_string();

    let _guard = state.locks.acquire(user.id, &url).await;
    if state.store.article_by_url(user.id, &url).await?.is_some() {
        return Err(ApiError::BadRequest("Article already saved".to_string()));
    }

    let record = state.articles.fetch_article(&url).await;
    let article = state.store.insert_article(user.id, record).await?;
    info!(user_id = user.id, article_id = article.id, url = %article.record.url, "article saved");

    Ok((StatusCode::CREATED, Json(article)))
}

async fn list_articles(
    State(state): State<AppState>, AuthUser(user): AuthUser, params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ArticlePage>, ApiError> {
    let Query(params) = params?;
    let filter = ArticleFilter { is_read: params.is_read, is_archived: params.is_archived };
    let page = page(params.limit, params.offset)?;

    Ok(Json(state.store.list_articles(user.id, filter, page).await?))
}

async fn search_articles(
    State(state): State<AppState>, AuthUser(user): AuthUser, params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<ArticlePage>, ApiError> {
    let Query(params) = params?;
    let query = params
        .q
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::Unprocessable("Search query must not be empty".to_string()))?;
    let page = page(params.limit, params.offset)?;

    Ok(Json(state.store.search_articles(user.id, &query, page).await?))
}

async fn get_article(
    State(state): State<AppState>, AuthUser(user): AuthUser, id: Result<Path<ArticleId>, PathRejection>,
) -> Result<Json<StoredArticle>, ApiError> {
    let Path(id) = id?;
    let article = state.store.get_article(user.id, id).await?.ok_or_else(ApiError::article_not_found)?;
    Ok(Json(article))
}

async fn update_article(
    State(state): State<AppState>, AuthUser(user): AuthUser, id: Result<Path<ArticleId>, PathRejection>,
    payload: Result<Json<ArticleFlags>, JsonRejection>,
) -> Result<Json<StoredArticle>, ApiError> {
    let Path(id) = id?;
    let Json(flags) = payload?;
    let update = ArticleUpdate { is_read: flags.is_read, is_archived: flags.is_archived };

    let article = state.store.update_article(user.id, id, update).await?.ok_or_else(ApiError::article_not_found)?;
    Ok(Json(article))
}

async fn delete_article(
    State(state): State<AppState>, AuthUser(user): AuthUser, id: Result<Path<ArticleId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    if !state.store.delete_article(user.id, id).await? {
        return Err(ApiError::article_not_found());
    }

    info!(user_id = user.id, article_id = id, "article deleted");
    Ok(StatusCode::NO_CONTENT)
}
