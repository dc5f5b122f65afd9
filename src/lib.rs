pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::ServerConfig;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{any, get},
};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_timing,
        api::handlers::telemetry::log_telemetry,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::UploadTimingResponse,
            models::TelemetryAck,
            models::ErrorEnvelope,
            models::UploadForm,
            models::TelemetryDocument,
            api::handlers::health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "timing", description = "Upload and telemetry endpoints"),
        (name = "system", description = "Liveness")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-api-key"))),
            );
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_app(state: AppState) -> Router {
    let multipart_limit = state.config.multipart_body_limit();

    // Timed routes accept every verb so the gate runs before the method check.
    let router = Router::new()
        .route("/", get(api::handlers::health::index))
        .route("/api/health", get(api::handlers::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route(
            "/upload",
            any(api::handlers::upload::upload_timing)
                .layer(DefaultBodyLimit::max(multipart_limit))
                .layer(from_fn_with_state(
                    state.clone(),
                    api::middleware::auth::auth_middleware,
                )),
        )
        .route(
            "/api/log",
            any(api::handlers::telemetry::log_telemetry).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::auth_middleware,
            )),
        )
        .layer(from_fn(api::middleware::security::security_headers))
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(CatchPanicLayer::custom(api::error::handle_panic));

    router.with_state(state)
}
