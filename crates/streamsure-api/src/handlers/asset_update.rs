use crate::auth::AuthSubject;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::upload::extract_file;
use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use std::sync::Arc;
use streamsure_core::models::{AssetPatch, AssetResponse};
use uuid::Uuid;

#[utoipa::path(
    patch,
    path = "/api/v0/assets/{id}",
    tag = "assets",
    params(
        ("id" = Uuid, Path, description = "Asset ID")
    ),
    request_body = AssetPatch,
    responses(
        (status = 200, description = "Asset updated", body = AssetResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_asset(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    Path(id): Path<Uuid>,
    ValidatedJson(patch): ValidatedJson<AssetPatch>,
) -> Result<Json<AssetResponse>, HttpAppError> {
    let asset = state.assets.update(&subject, id, patch).await?;
    Ok(Json(asset.into()))
}

#[utoipa::path(
    put,
    path = "/api/v0/assets/{id}/content",
    tag = "assets",
    params(
        ("id" = Uuid, Path, description = "Asset ID")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data", description = "Field: file"),
    responses(
        (status = 200, description = "Content replaced, moderation restarted", body = AssetResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 503, description = "Maintenance mode", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn replace_content(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<AssetResponse>, HttpAppError> {
    let file = extract_file(multipart).await?;
    let asset = state.assets.replace_content(&subject, id, file).await?;
    Ok(Json(asset.into()))
}
