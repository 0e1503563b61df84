use super::TestApp;
use streamsure_core::models::{Role, Subject};
use uuid::Uuid;

/// Signing secret used by every test app.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

/// An authenticated caller.
pub struct TestUser {
    pub subject: Subject,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.subject.id
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Mint a fresh subject with `role` and a valid token.
pub fn test_user(app: &TestApp, role: Role) -> TestUser {
    let subject = Subject::new(Uuid::new_v4(), role);
    let token = app
        .state
        .jwt
        .issue(&subject, 3600)
        .expect("Failed to issue test token");
    TestUser { subject, token }
}
