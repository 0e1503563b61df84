//! API constants

/// Versioned prefix of every JSON endpoint
pub const API_PREFIX: &str = "/api/v0";

/// Lifetime of tokens minted for local development
pub const DEV_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;
