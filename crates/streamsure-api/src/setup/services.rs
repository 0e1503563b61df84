//! Service wiring and application state

use crate::auth::JwtKeys;
use crate::services::{AssetService, DeliveryService};
use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use streamsure_core::{AccessPolicy, Config};
use streamsure_db::AssetRepository;
use streamsure_moderation::{EventBroadcaster, ModerationStages, PipelineEngine};
use streamsure_storage::Storage;

/// Build the application state with the simulated analyzers.
pub async fn initialize_services(
    config: &Config,
    repository: Arc<dyn AssetRepository>,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let stages = ModerationStages::simulated(&config.moderation);
    initialize_services_with_stages(config, repository, storage, stages).await
}

/// Build the application state around an explicit set of pipeline stages.
///
/// Assets left in `processing` by a previous process are rescheduled before
/// this returns.
pub async fn initialize_services_with_stages(
    config: &Config,
    repository: Arc<dyn AssetRepository>,
    storage: Arc<dyn Storage>,
    stages: ModerationStages,
) -> Result<Arc<AppState>> {
    let events = EventBroadcaster::new(config.event_channel_capacity);
    let engine = PipelineEngine::new(
        repository.clone(),
        stages,
        events.clone(),
        config.moderation.stage_timeout(),
    );

    let resumed = engine
        .resume_processing(Duration::ZERO)
        .await
        .context("Failed to resume pending moderation runs")?;
    if resumed > 0 {
        tracing::info!(resumed, "Resumed moderation of assets left in processing");
    }
    if let Some(every) = config.moderation.reap_interval() {
        engine.spawn_reaper(every);
    }

    let policy = AccessPolicy::new(config.viewer_sees_own_uploads);
    tracing::info!(
        viewer_sees_own_uploads = config.viewer_sees_own_uploads,
        maintenance_mode = config.maintenance_mode,
        stage_timeout_secs = config.moderation.stage_timeout_secs,
        "Services initialized"
    );

    let assets = AssetService::new(
        repository,
        storage,
        engine,
        policy,
        config.max_upload_size_bytes,
        config.maintenance_mode,
    );
    let delivery = DeliveryService::new(assets.clone());

    Ok(Arc::new(AppState {
        config: config.clone(),
        assets,
        delivery,
        events,
        jwt: JwtKeys::new(&config.jwt_secret),
    }))
}
