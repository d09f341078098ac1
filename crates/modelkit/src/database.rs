//! Database connectivity - pool configuration and creation
//!
//! Environment-driven configuration and a `PgPoolOptions` wrapper so
//! applications can stand up the shared pool the mixins operate against.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::error::ModelError;

/// Connection pool error types
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Connection acquisition failed: {0}")]
    AcquisitionFailed(#[from] sqlx::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl From<PoolError> for ModelError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::AcquisitionFailed(sqlx_err) => {
                ModelError::Connection(format!("Database connection failed: {}", sqlx_err))
            }
            PoolError::Configuration { message } => {
                ModelError::Connection(format!("Database configuration error: {}", message))
            }
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/modelkit_dev".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Read configuration from the environment. `DATABASE_URL` is required;
    /// the pool knobs fall back to the defaults above.
    pub fn from_env() -> Result<Self, PoolError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    // Variable lookup is injected so tests never touch process environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PoolError> {
        let url = lookup("DATABASE_URL").ok_or_else(|| PoolError::Configuration {
            message: "DATABASE_URL is not set".to_string(),
        })?;

        Ok(Self {
            url,
            max_connections: parse_number(
                "DATABASE_MAX_CONNECTIONS",
                lookup("DATABASE_MAX_CONNECTIONS"),
                10,
            )?,
            min_connections: parse_number(
                "DATABASE_MIN_CONNECTIONS",
                lookup("DATABASE_MIN_CONNECTIONS"),
                1,
            )?,
            acquire_timeout_seconds: parse_number(
                "DATABASE_ACQUIRE_TIMEOUT_SECONDS",
                lookup("DATABASE_ACQUIRE_TIMEOUT_SECONDS"),
                30,
            )?,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, PoolError> {
    match raw {
        Some(raw) => raw.parse().map_err(|_| PoolError::Configuration {
            message: format!("{} must be a number, got '{}'", name, raw),
        }),
        None => Ok(default),
    }
}

/// Create a Postgres connection pool from the given configuration.
pub async fn create_pool(config: &DatabaseConfig) -> Result<Pool<Postgres>, PoolError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "database pool created"
    );

    Ok(pool)
}
