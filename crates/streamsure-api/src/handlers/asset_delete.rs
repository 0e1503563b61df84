use crate::auth::AuthSubject;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    delete,
    path = "/api/v0/assets/{id}",
    tag = "assets",
    params(
        ("id" = Uuid, Path, description = "Asset ID")
    ),
    responses(
        (status = 204, description = "Asset deleted"),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_asset(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    state.assets.delete(&subject, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
