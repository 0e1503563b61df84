//! OpenAPI documentation.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use streamsure_core::models;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StreamSure API",
        version = "0.1.0",
        description = "Media moderation and delivery API (v0). Uploaded assets are scored by a weighted moderation pipeline, access is role based, and approved media is streamed with HTTP range support. All endpoints except /health are versioned under /api/v0/."
    ),
    modifiers(&BearerAuth),
    paths(
        // Assets
        handlers::asset_upload::upload_asset,
        handlers::asset_get::list_assets,
        handlers::asset_get::get_asset,
        handlers::asset_update::update_asset,
        handlers::asset_update::replace_content,
        handlers::asset_delete::delete_asset,
        // Delivery
        handlers::asset_stream::stream_asset,
        // Moderation
        handlers::asset_review::review_asset,
        handlers::events::stream_events,
        // Settings
        handlers::settings::get_settings,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::AssetResponse,
            models::AssetPatch,
            models::AssetStatus,
            models::ReviewAction,
            models::Role,
            models::Stage,
            handlers::asset_review::ReviewRequest,
            handlers::settings::SettingsResponse,
            handlers::settings::ModerationSettingsResponse,
            handlers::health::HealthResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "assets", description = "Asset submission, listing, editing and deletion"),
        (name = "delivery", description = "Byte-range streaming of asset content"),
        (name = "moderation", description = "Administrative review and live pipeline events"),
        (name = "settings", description = "Service configuration"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_versioned_paths() {
        let spec = ApiDoc::openapi();
        assert!(spec.paths.paths.contains_key("/api/v0/assets"));
        assert!(spec.paths.paths.contains_key("/api/v0/assets/{id}/stream"));
        assert!(spec.paths.paths.contains_key("/health"));
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
