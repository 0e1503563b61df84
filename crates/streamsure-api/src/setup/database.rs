//! Repository backend selection

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use streamsure_core::Config;
use streamsure_db::{AssetRepository, InMemoryAssetRepository, PgAssetRepository};

/// PostgreSQL when `DATABASE_URL` is set, otherwise a process-local store.
pub async fn setup_database(config: &Config) -> Result<Arc<dyn AssetRepository>> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, assets are kept in memory and lost on restart");
        return Ok(Arc::new(InMemoryAssetRepository::new()));
    };

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected successfully"
    );

    streamsure_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(Arc::new(PgAssetRepository::new(pool)))
}
