//! demgrid Service Library
//!
//! HTTP handlers, routing and configuration for the elevation service.
//! This library is used by both the demgrid-service binary and integration tests.

pub mod config;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use demgrid::ElevationService;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers.
pub struct AppState {
    /// Elevation service for lookups.
    pub service: ElevationService,
    /// Largest accepted batch request.
    pub max_batch_size: usize,
}

/// OpenAPI documentation for the demgrid service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "demgrid Elevation Service",
        version = "0.1.0",
        description = "REST API for nearest-cell elevation lookups over an in-memory grid.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::get_elevation,
        handlers::post_batch,
        handlers::health_check,
        handlers::get_stats,
    ),
    components(
        schemas(
            handlers::ElevationResponse,
            handlers::PointRequest,
            handlers::BatchRequest,
            handlers::BatchResponse,
            handlers::ErrorResponse,
            handlers::HealthResponse,
            handlers::StatsResponse,
        )
    ),
    tags(
        (name = "elevation", description = "Elevation query endpoints"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the application router with documentation routes.
///
/// Middleware (tracing, CORS, timeouts) is added by the binary.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/elevation", get(handlers::get_elevation))
        .route("/elevation/batch", post(handlers::post_batch))
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        .with_state(state)
}

// Re-export commonly used types for convenience
pub use config::ServiceConfig;
pub use handlers::{
    BatchRequest, BatchResponse, ElevationQuery, ElevationResponse, ErrorResponse, HealthResponse,
    PointRequest, StatsResponse,
};
