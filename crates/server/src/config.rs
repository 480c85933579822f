//! Server configuration from flags and `STASH_*` environment variables.
//!
//! Built once in `main` and handed to the components that need it.

use std::net::SocketAddr;
use std::str::FromStr;

use clap::Parser;
use stash_core::{FetchConfig, IngestConfig};

pub const DEFAULT_SECRET_KEY: &str = "change-me-in-production";

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 525_600;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid log format: {}. Valid options: text, json", s)),
        }
    }
}

/// Read-it-later HTTP API
#[derive(Parser, Debug, Clone)]
#[command(name = "stash-server")]
#[command(version)]
#[command(about = "Read-it-later HTTP API", long_about = None)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "STASH_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Postgres connection string; articles are kept in memory when unset
    #[arg(long, env = "STASH_DATABASE_URL")]
    pub database_url: Option<String>,

    /// HMAC key for access tokens
    #[arg(long, env = "STASH_SECRET_KEY", default_value = DEFAULT_SECRET_KEY, hide_env_values = true)]
    pub secret_key: String,

    /// Access token lifetime in minutes
    #[arg(
        long,
        env = "STASH_TOKEN_TTL_MINUTES",
        default_value = "1440",
        value_parser = clap::value_parser!(i64).range(1..=MAX_TOKEN_TTL_MINUTES)
    )]
    pub token_ttl_minutes: i64,

    /// PBKDF2 iterations for new password hashes
    #[arg(long, env = "STASH_PASSWORD_ITERATIONS", default_value = "100000")]
    pub password_iterations: u32,

    /// Comma-separated list of allowed CORS origins
    #[arg(
        long,
        env = "STASH_CORS_ORIGINS",
        default_value = "http://localhost:5173,http://localhost:3000",
        value_delimiter = ','
    )]
    pub cors_origins: Vec<String>,

    /// Timeout for fetching article pages, in seconds
    #[arg(long, env = "STASH_FETCH_TIMEOUT", default_value = "30")]
    pub fetch_timeout: u64,

    /// User-Agent sent when fetching article pages
    #[arg(long, env = "STASH_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Log output format (text, json)
    #[arg(long, env = "STASH_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Ingestion settings derived from the fetch options.
    pub fn ingest_config(&self) -> IngestConfig {
        let mut fetch = FetchConfig { timeout: self.fetch_timeout, ..Default::default() };
        if let Some(user_agent) = &self.user_agent {
            fetch.user_agent = user_agent.clone();
        }

        IngestConfig::builder().fetch_config(fetch).build()
    }

    /// Trimmed, non-empty CORS origins.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origins.iter().map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect()
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}
