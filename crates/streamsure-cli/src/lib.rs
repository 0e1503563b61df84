//! Helpers shared by the `streamsure` command-line client.

pub mod api_client;

use streamsure_api::auth::JwtKeys;
use streamsure_core::models::{Role, Subject};
use uuid::Uuid;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Mint a bearer token the API will accept, for local development.
pub fn mint_token(
    secret: &str,
    subject_id: Option<Uuid>,
    role: Role,
    ttl_secs: i64,
) -> anyhow::Result<(Subject, String)> {
    let subject = Subject::new(subject_id.unwrap_or_else(Uuid::new_v4), role);
    let token = JwtKeys::new(secret).issue(&subject, ttl_secs)?;
    Ok((subject, token))
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn minted_token_verifies_with_same_secret() {
        let secret = "a-development-secret-of-sufficient-length";
        let id = Uuid::new_v4();
        let (subject, token) = mint_token(secret, Some(id), Role::Editor, 60).unwrap();
        assert_eq!(subject.id, id);

        let verified = JwtKeys::new(secret).verify(&token).unwrap();
        assert_eq!(verified, subject);
    }
}
