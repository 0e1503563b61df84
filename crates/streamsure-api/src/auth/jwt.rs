use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use streamsure_core::models::Subject;
use streamsure_core::AppError;

use super::models::JwtClaims;

/// HS256 signing and verification keys derived from the shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys").finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Mint a token for `subject` valid for `ttl_secs`.
    pub fn issue(&self, subject: &Subject, ttl_secs: i64) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            sub: subject.id,
            role: subject.role,
            exp: now + ttl_secs,
            iat: Some(now),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Subject, AppError> {
        decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.subject())
            .map_err(|e| {
                tracing::debug!(error = %e, "Token verification failed");
                AppError::Unauthorized("Invalid or expired token".to_string())
            })
    }
}
