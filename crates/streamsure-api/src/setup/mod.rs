//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use streamsure_core::Config;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(&config.environment);
    tracing::info!("Configuration loaded and validated successfully");

    let repository = database::setup_database(&config).await?;

    let storage = streamsure_storage::create_storage(&config)
        .await
        .context("Failed to initialize storage")?;

    let state = services::initialize_services(&config, repository, storage).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
