//! HTTP API for the stash read-it-later service.
//!
//! Users sign up, save article URLs, and manage their reading list. Saving a
//! URL runs it through the [`stash_core`] ingestion pipeline and stores the
//! resulting record under the caller's account.

pub mod auth;
pub mod config;
pub mod error;
pub mod locks;
pub mod routes;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use auth::{AuthUser, PasswordHasher, TokenService};
pub use config::{LogFormat, ServerConfig};
pub use error::ApiError;
pub use locks::SaveLocks;
pub use routes::ArticleSource;
pub use store::{MemoryStore, PgStore, Store, StoreError};

/// Upper bound on a single request, ingestion included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub articles: Arc<dyn ArticleSource>,
    pub tokens: TokenService,
    pub passwords: PasswordHasher,
    pub locks: Arc<SaveLocks>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>, articles: Arc<dyn ArticleSource>, tokens: TokenService, passwords: PasswordHasher,
    ) -> Self {
        Self { store, articles, tokens, passwords, locks: Arc::new(SaveLocks::new()) }
    }
}

/// Builds the router with tracing, CORS, compression and timeout layers.
pub fn create_app(state: AppState, cors_origins: &[String]) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(cors_layer(cors_origins));

    routes::router().layer(middleware).with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}
