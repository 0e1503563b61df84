use crate::auth::AuthSubject;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::extract_submission;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use streamsure_core::models::AssetResponse;

#[utoipa::path(
    post,
    path = "/api/v0/assets",
    tag = "assets",
    request_body(content = inline(Object), content_type = "multipart/form-data",
        description = "Fields: file, title, description?, is_public?, allowed_users? (JSON array of UUIDs)"),
    responses(
        (status = 201, description = "Asset accepted for moderation", body = AssetResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Role may not upload", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 503, description = "Maintenance mode", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_asset(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let submission = extract_submission(multipart).await?;
    let asset = state.assets.submit(&subject, submission).await?;
    Ok((StatusCode::CREATED, Json(AssetResponse::from(asset))))
}
