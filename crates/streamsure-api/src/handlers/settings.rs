use crate::auth::AuthSubject;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use streamsure_core::AppError;
use utoipa::ToSchema;

/// Non-secret process settings.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsResponse {
    pub environment: String,
    pub max_upload_size_mb: u64,
    pub maintenance_mode: bool,
    pub viewer_sees_own_uploads: bool,
    pub database_backend: String,
    pub event_channel_capacity: usize,
    pub moderation: ModerationSettingsResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModerationSettingsResponse {
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub stage_timeout_secs: u64,
    pub reap_interval_secs: u64,
    pub denylist: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/v0/settings",
    tag = "settings",
    responses(
        (status = 200, description = "Current settings", body = SettingsResponse),
        (status = 403, description = "Administrators only", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
) -> Result<Json<SettingsResponse>, HttpAppError> {
    if !subject.is_admin() {
        return Err(AppError::Forbidden("Settings are restricted to administrators".to_string()).into());
    }

    let config = &state.config;
    Ok(Json(SettingsResponse {
        environment: config.environment.clone(),
        max_upload_size_mb: config.max_upload_size_bytes / 1024 / 1024,
        maintenance_mode: config.maintenance_mode,
        viewer_sees_own_uploads: config.viewer_sees_own_uploads,
        database_backend: if config.database_url.is_some() {
            "postgres".to_string()
        } else {
            "memory".to_string()
        },
        event_channel_capacity: config.event_channel_capacity,
        moderation: ModerationSettingsResponse {
            min_latency_ms: config.moderation.min_latency_ms,
            max_latency_ms: config.moderation.max_latency_ms,
            stage_timeout_secs: config.moderation.stage_timeout_secs,
            reap_interval_secs: config.moderation.reap_interval_secs,
            denylist: config.moderation.denylist.clone(),
        },
    }))
}
