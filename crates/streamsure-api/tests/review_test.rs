//! Administrative review integration tests.
//!
//! Run with: `cargo test -p streamsure-api --test review_test`

mod helpers;

use axum::http::StatusCode;
use helpers::auth::test_user;
use helpers::fixtures::{media_bytes, public_upload_form};
use helpers::{api_path, setup_test_app, setup_test_app_with, slow_stages, wait_for_status, FLAG_TERM};
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use streamsure_core::models::{AssetStatus, PipelineEvent, Role};
use streamsure_moderation::EventFilter;

fn review_path(id: &str) -> String {
    api_path(&format!("/assets/{}/review", id))
}

#[tokio::test]
async fn test_only_admins_review() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = test_user(&app, Role::Editor);

    let created: Value = client
        .post(&api_path("/assets"))
        .add_header("Authorization", owner.bearer())
        .multipart(public_upload_form("clip", media_bytes(10)))
        .await
        .json();
    let id = created["id"].as_str().unwrap();

    for role in [Role::Editor, Role::Viewer] {
        let user = test_user(&app, role);
        let response = client
            .put(&review_path(id))
            .add_header("Authorization", user.bearer())
            .json(&json!({ "action": "reject" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN, "{}", role);
    }
}

#[tokio::test]
async fn test_admin_approves_flagged_asset() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = test_user(&app, Role::Editor);
    let admin = test_user(&app, Role::Admin);
    let viewer = test_user(&app, Role::Viewer);

    let created: Value = client
        .post(&api_path("/assets"))
        .add_header("Authorization", owner.bearer())
        .multipart(public_upload_form(FLAG_TERM, media_bytes(10)))
        .await
        .json();
    let id = created["id"].as_str().unwrap();
    wait_for_status(client, &owner.token, id, "flagged").await;

    let response = client
        .put(&review_path(id))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "action": "approve", "notes": "artistic context" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let reviewed: Value = response.json();
    assert_eq!(reviewed["status"], "safe");
    assert_eq!(reviewed["admin_notes"], "artistic context");

    // Now visible to viewers
    let response = client
        .get(&api_path(&format!("/assets/{}", id)))
        .add_header("Authorization", viewer.bearer())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_rejects_safe_asset() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = test_user(&app, Role::Editor);
    let admin = test_user(&app, Role::Admin);

    let created: Value = client
        .post(&api_path("/assets"))
        .add_header("Authorization", owner.bearer())
        .multipart(public_upload_form("clip", media_bytes(10)))
        .await
        .json();
    let id = created["id"].as_str().unwrap();
    wait_for_status(client, &owner.token, id, "safe").await;

    let response = client
        .put(&review_path(id))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "action": "reject" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "flagged");
}

#[tokio::test]
async fn test_repeated_review_publishes_once() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = test_user(&app, Role::Editor);
    let admin = test_user(&app, Role::Admin);

    let created: Value = client
        .post(&api_path("/assets"))
        .add_header("Authorization", owner.bearer())
        .multipart(public_upload_form(FLAG_TERM, media_bytes(10)))
        .await
        .json();
    let id = created["id"].as_str().unwrap();
    wait_for_status(client, &owner.token, id, "flagged").await;

    let mut events = Box::pin(app.state.events.subscribe_stream(EventFilter::All));
    for notes in ["ok", "ok", "still ok"] {
        let response = client
            .put(&review_path(id))
            .add_header("Authorization", admin.bearer())
            .json(&json!({ "action": "approve", "notes": notes }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["admin_notes"], notes);
    }

    let mut completions = Vec::new();
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(200), events.next()).await
    {
        if let PipelineEvent::Completion { status, .. } = event {
            completions.push(status);
        }
    }
    assert_eq!(completions, vec![AssetStatus::Safe]);
}

#[tokio::test]
async fn test_review_overrides_in_flight_pipeline() {
    let app = setup_test_app_with(|_| {}, slow_stages(Duration::from_millis(200))).await;
    let client = app.client();
    let owner = test_user(&app, Role::Editor);
    let admin = test_user(&app, Role::Admin);

    // Would settle as flagged if the pipeline were allowed to commit
    let created: Value = client
        .post(&api_path("/assets"))
        .add_header("Authorization", owner.bearer())
        .multipart(public_upload_form(FLAG_TERM, media_bytes(10)))
        .await
        .json();
    let id = created["id"].as_str().unwrap();
    assert_eq!(created["status"], "processing");

    let response = client
        .put(&review_path(id))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "action": "approve" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "safe");

    // Give the run time to finish and attempt its commit
    for _ in 0..100 {
        if app.state.assets.engine().runs().active_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let current: Value = client
        .get(&api_path(&format!("/assets/{}", id)))
        .add_header("Authorization", admin.bearer())
        .await
        .json();
    assert_eq!(current["status"], "safe");
}

#[tokio::test]
async fn test_review_validation_and_missing_asset() {
    let app = setup_test_app().await;
    let client = app.client();
    let admin = test_user(&app, Role::Admin);

    let response = client
        .put(&review_path(&uuid::Uuid::new_v4().to_string()))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "action": "approve" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = client
        .put(&review_path(&uuid::Uuid::new_v4().to_string()))
        .add_header("Authorization", admin.bearer())
        .json(&json!({ "action": "escalate" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
