use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use stash_core::Ingestor;
use stash_server::{
    AppState, LogFormat, MemoryStore, PasswordHasher, PgStore, ServerConfig, Store, TokenService, create_app,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    }
    .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_tracing(config.log_format)?;

    if config.uses_default_secret() {
        warn!("STASH_SECRET_KEY is not set; tokens are signed with the built-in development key");
    }

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url).await.context("failed to connect to the database")?;
            info!("using postgres store");
            Arc::new(store)
        }
        None => {
            warn!("no database configured; articles are kept in memory and lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let ingestor = Ingestor::new(config.ingest_config()).context("failed to build HTTP client")?;
    let state = AppState::new(
        store,
        Arc::new(ingestor),
        TokenService::new(&config.secret_key, config.token_ttl_minutes),
        PasswordHasher::new(config.password_iterations),
    );
    let app = create_app(state, &config.cors_origins());

    let listener =
        tokio::net::TcpListener::bind(config.bind).await.with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "stash server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}
