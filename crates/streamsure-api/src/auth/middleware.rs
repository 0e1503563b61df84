use crate::auth::jwt::JwtKeys;
use crate::error::HttpAppError;
use axum::{
    extract::{Query, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use streamsure_core::AppError;

#[derive(Debug, Clone)]
pub struct AuthState {
    pub keys: JwtKeys,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Bearer header first, then `?token=` for media elements that cannot set headers.
fn extract_token(request: &Request) -> Result<String, AppError> {
    if let Some(value) = request.headers().get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;
        return value
            .strip_prefix("Bearer ")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized("Invalid authorization header format".to_string())
            });
    }

    Query::<TokenQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.token)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let subject = match extract_token(&request).and_then(|token| auth_state.keys.verify(&token)) {
        Ok(subject) => subject,
        Err(e) => return HttpAppError(e).into_response(),
    };

    tracing::debug!(subject_id = %subject.id, role = %subject.role, "Request authenticated");
    request.extensions_mut().insert(subject);
    next.run(request).await
}
