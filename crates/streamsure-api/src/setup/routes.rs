//! Route configuration and setup

use crate::api_doc::ApiDoc;
use crate::auth::middleware::{auth_middleware, AuthState};
use crate::constants::API_PREFIX;
use crate::handlers::{
    asset_delete, asset_get, asset_review, asset_stream, asset_update, asset_upload, events,
    health, settings,
};
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use streamsure_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Room for multipart framing and the text fields around the file.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config);
    let auth_state = Arc::new(AuthState {
        keys: state.jwt.clone(),
    });

    let protected = protected_routes().layer(axum::middleware::from_fn_with_state(
        auth_state,
        auth_middleware,
    ));

    let body_limit = usize::try_from(config.max_upload_size_bytes + MULTIPART_OVERHEAD_BYTES)
        .unwrap_or(usize::MAX);

    let app = public_routes()
        .nest(API_PREFIX, protected)
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
}

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/assets",
            post(asset_upload::upload_asset).get(asset_get::list_assets),
        )
        .route(
            "/assets/{id}",
            get(asset_get::get_asset)
                .patch(asset_update::update_asset)
                .delete(asset_delete::delete_asset),
        )
        .route("/assets/{id}/content", put(asset_update::replace_content))
        .route("/assets/{id}/review", put(asset_review::review_asset))
        .route("/assets/{id}/stream", get(asset_stream::stream_asset))
        .route("/events", get(events::stream_events))
        .route("/settings", get(settings::get_settings))
}

fn setup_cors(config: &Config) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    if config.cors_origins.iter().any(|o| o == "*") {
        if !config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
            .expose_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
            .expose_headers(Any)
    }
}
