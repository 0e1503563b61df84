use crate::auth::AuthSubject;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use streamsure_core::models::AssetResponse;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v0/assets",
    tag = "assets",
    responses(
        (status = 200, description = "Assets visible to the caller, newest first", body = Vec<AssetResponse>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_assets(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
) -> Result<Json<Vec<AssetResponse>>, HttpAppError> {
    let assets = state.assets.list(&subject).await?;
    Ok(Json(assets.into_iter().map(AssetResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v0/assets/{id}",
    tag = "assets",
    params(
        ("id" = Uuid, Path, description = "Asset ID")
    ),
    responses(
        (status = 200, description = "Asset", body = AssetResponse),
        (status = 404, description = "Asset not found or not visible", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    Path(id): Path<Uuid>,
) -> Result<Json<AssetResponse>, HttpAppError> {
    let asset = state.assets.get(&subject, id).await?;
    Ok(Json(asset.into()))
}
