use crate::auth::AuthSubject;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use streamsure_core::models::{AssetResponse, ReviewAction};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub action: ReviewAction,
    pub notes: Option<String>,
}

#[utoipa::path(
    put,
    path = "/api/v0/assets/{id}/review",
    tag = "moderation",
    params(
        ("id" = Uuid, Path, description = "Asset ID")
    ),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Manual classification recorded", body = AssetResponse),
        (status = 403, description = "Administrators only", body = ErrorResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn review_asset(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ReviewRequest>,
) -> Result<Json<AssetResponse>, HttpAppError> {
    let asset = state
        .assets
        .review(&subject, id, request.action, request.notes)
        .await?;
    Ok(Json(asset.into()))
}
