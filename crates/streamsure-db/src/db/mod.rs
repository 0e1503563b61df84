//! Database repositories for the data access layer

pub mod asset;

use sqlx::PgPool;

/// Apply the workspace migrations to `pool`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
