//! Bearer token identity
//!
//! Tokens are HS256 JWTs carrying `{sub, role, exp}`. The verified claims are
//! trusted as-is; there is no user store behind them.

pub mod jwt;
pub mod middleware;
pub mod models;

pub use jwt::JwtKeys;
pub use models::{AuthSubject, JwtClaims};
