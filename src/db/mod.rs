//! Database connection and pool management for MarkChain
//!
//! Handles PostgreSQL connection pooling and migrations.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::Config;

/// Database connection error
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Failed to run migrations: {0}")]
    MigrationError(String),

    #[error("Database health check failed: {0}")]
    HealthCheckError(String),
}

/// Create a database connection pool
pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| DbError::ConnectionError("DATABASE_URL is not set".to_string()))?;

    tracing::info!("Connecting to database at {}", config.database_url_masked());

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(url)
        .await
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;

    tracing::info!("Database connection pool created");

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::MigrationError(e.to_string()))?;

    tracing::info!("Database migrations completed");

    Ok(())
}

/// Check database connectivity (for health checks)
pub async fn check_health(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| DbError::HealthCheckError(e.to_string()))?;

    Ok(())
}
