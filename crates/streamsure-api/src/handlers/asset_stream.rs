use crate::auth::AuthSubject;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use futures::StreamExt;
use std::sync::Arc;
use streamsure_core::AppError;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v0/assets/{id}/stream",
    tag = "delivery",
    params(
        ("id" = Uuid, Path, description = "Asset ID"),
        ("Range" = Option<String>, Header, description = "Single range, e.g. bytes=0-1023"),
        ("token" = Option<String>, Query, description = "Bearer token for media elements that cannot send headers")
    ),
    responses(
        (status = 200, description = "Whole asset", content_type = "application/octet-stream"),
        (status = 206, description = "Requested range", content_type = "application/octet-stream"),
        (status = 400, description = "Malformed Range header", body = ErrorResponse),
        (status = 404, description = "Asset not found or not visible", body = ErrorResponse),
        (status = 416, description = "Range starts beyond the end of the asset", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn stream_asset(
    State(state): State<Arc<AppState>>,
    AuthSubject(subject): AuthSubject,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    let range_header = headers
        .get(header::RANGE)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AppError::InvalidInput("Malformed range header".to_string()))
        })
        .transpose()?;

    let delivery = state.delivery.open(&subject, id, range_header).await?;

    let status = if delivery.range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, delivery.content_type.as_str())
        .header(header::CONTENT_LENGTH, delivery.content_length())
        .header(header::ACCEPT_RANGES, "bytes");
    if let Some(range) = delivery.range {
        builder = builder.header(header::CONTENT_RANGE, range.content_range());
    }

    let body_stream = delivery.body.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    builder.body(Body::from_stream(body_stream)).map_err(|e| {
        tracing::error!(error = %e, "Failed to build response");
        HttpAppError(AppError::Internal(e.to_string()))
    })
}
