use crate::error::HttpAppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use streamsure_core::models::{Role, Subject};
use streamsure_core::AppError;
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl JwtClaims {
    pub fn subject(&self) -> Subject {
        Subject::new(self.sub, self.role)
    }
}

/// The authenticated subject, placed in request extensions by the auth middleware.
///
/// Implemented as an extractor rather than `Extension` so it composes with
/// `Multipart`, which must be the last extractor.
#[derive(Debug, Clone, Copy)]
pub struct AuthSubject(pub Subject);

impl<S> FromRequestParts<S> for AuthSubject
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Subject>()
            .copied()
            .map(AuthSubject)
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("Missing subject".to_string())))
    }
}
