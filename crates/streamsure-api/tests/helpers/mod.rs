//! Test helpers: build AppState and router for integration tests.
//!
//! Everything runs in-process: the in-memory repository, local storage in a
//! temporary directory and deterministic analyzers.

pub mod auth;
pub mod fixtures;

use axum_test::TestServer;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use streamsure_api::constants;
use streamsure_api::setup::{routes, services};
use streamsure_api::state::AppState;
use streamsure_core::Config;
use streamsure_db::{AssetRepository, InMemoryAssetRepository};
use streamsure_moderation::{
    ContextAnalyzer, FixedScoreAnalyzer, ModerationStages, SizeBasedMetadataExtractor,
};
use streamsure_storage::{LocalStorage, Storage};
use tempfile::TempDir;

/// Term that makes the context analyzer tip an asset into `flagged`.
pub const FLAG_TERM: &str = "explicit";

/// Risk score of an asset without the flag term: 0.5*0.9 + 0.3*0.2 + 0.2*0.1
pub const SAFE_SCORE: f64 = 0.53;

/// Risk score of an asset with the flag term: 0.5*0.9 + 0.3*0.2 + 0.2*0.9
pub const FLAGGED_SCORE: f64 = 0.69;

/// API path prefix for tests (e.g. `/api/v0/assets`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server, state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Stages whose outcome depends only on whether the title or description
/// contains [`FLAG_TERM`].
pub fn deterministic_stages() -> ModerationStages {
    slow_stages(Duration::ZERO)
}

/// Like [`deterministic_stages`] but the visual stage waits for `delay`.
pub fn slow_stages(delay: Duration) -> ModerationStages {
    ModerationStages {
        metadata: Arc::new(SizeBasedMetadataExtractor),
        visual: Arc::new(FixedScoreAnalyzer::new("visual", 0.9).with_delay(delay)),
        audio: Arc::new(FixedScoreAnalyzer::new("audio", 0.2)),
        context: Arc::new(ContextAnalyzer::new([FLAG_TERM])),
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}, deterministic_stages()).await
}

/// Setup test app with a customised configuration and pipeline.
pub async fn setup_test_app_with(
    configure: impl FnOnce(&mut Config),
    stages: ModerationStages,
) -> TestApp {
    setup_test_app_with_repository(configure, stages, |_| {
        Arc::new(InMemoryAssetRepository::new())
    })
    .await
}

/// Setup test app around a repository built from the app's storage.
pub async fn setup_test_app_with_repository(
    configure: impl FnOnce(&mut Config),
    stages: ModerationStages,
    repository: impl FnOnce(Arc<dyn Storage>) -> Arc<dyn AssetRepository>,
) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let mut config = Config {
        jwt_secret: auth::TEST_JWT_SECRET.to_string(),
        local_storage_path: temp_dir.path().to_string_lossy().to_string(),
        ..Config::default()
    };
    configure(&mut config);

    let storage = LocalStorage::new(temp_dir.path())
        .await
        .expect("Failed to create local storage");
    let storage: Arc<dyn Storage> = Arc::new(storage);
    let state = services::initialize_services_with_stages(
        &config,
        repository(storage.clone()),
        storage,
        stages,
    )
    .await
    .expect("Failed to initialize services");

    let router =
        routes::setup_routes(&config, state.clone()).expect("Failed to set up routes");
    let server =
        TestServer::new(router.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

/// Poll an asset until it reaches `expected` status, returning its JSON.
pub async fn wait_for_status(client: &TestServer, token: &str, id: &str, expected: &str) -> Value {
    let mut last = Value::Null;
    for _ in 0..300 {
        let response = client
            .get(&api_path(&format!("/assets/{}", id)))
            .add_header("Authorization", format!("Bearer {}", token))
            .await;
        if response.status_code() == 200 {
            last = response.json::<Value>();
            if last["status"] == expected {
                return last;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Asset {} never reached status {}; last seen: {}", id, expected, last);
}
