//! HTTP request handlers for the elevation service.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use demgrid::{BatchPoint, GridError};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::AppState;

/// Query parameters for elevation endpoint.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ElevationQuery {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

/// Elevation at a single coordinate.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ElevationResponse {
    /// Latitude queried.
    pub lat: f64,
    /// Longitude queried.
    pub lon: f64,
    /// Elevation in meters, or -9999 where no data is recorded.
    pub elevation: f64,
}

/// A coordinate in a batch request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PointRequest {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

/// Batch elevation request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchRequest {
    /// Points to resolve, at most `max_batch_size`.
    pub points: Vec<PointRequest>,
}

/// Batch elevation response, one entry per requested point in request order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchResponse {
    pub results: Vec<ElevationResponse>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Resident memory in MiB.
    pub memory_mb: u64,
    /// OS threads in the process.
    pub threads: usize,
    /// Seconds since startup.
    pub uptime_seconds: f64,
    /// Requests served, counting each batch point.
    pub total_requests: u64,
    /// Service version.
    pub version: String,
}

/// Result cache statistics response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    /// Number of cached results.
    pub cached_entries: u64,
    /// Cache hit count.
    pub cache_hits: u64,
    /// Cache miss count.
    pub cache_misses: u64,
    /// Cache hit rate (0.0 to 1.0).
    pub hit_rate: f64,
}

/// Get elevation for given coordinates.
///
/// Returns the elevation of the grid cell containing the coordinate.
#[utoipa::path(
    get,
    path = "/elevation",
    tag = "elevation",
    params(ElevationQuery),
    responses(
        (status = 200, description = "Elevation found", body = ElevationResponse),
        (status = 400, description = "Missing, malformed or out-of-bounds coordinates", body = ErrorResponse)
    )
)]
#[axum::debug_handler]
pub async fn get_elevation(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ElevationQuery>,
) -> impl IntoResponse {
    let start = Instant::now();

    match state.service.get_elevation(query.lat, query.lon) {
        Ok(elevation) => {
            tracing::debug!(
                lat = query.lat,
                lon = query.lon,
                elevation = elevation,
                elapsed_us = start.elapsed().as_micros() as u64,
                "Elevation found"
            );
            (
                StatusCode::OK,
                Json(ElevationResponse {
                    lat: query.lat,
                    lon: query.lon,
                    elevation,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(query.lat, query.lon, e),
    }
}

/// Get elevations for a batch of coordinates.
///
/// Points outside the grid are reported with elevation -9999 rather than
/// failing the request.
#[utoipa::path(
    post,
    path = "/elevation/batch",
    tag = "elevation",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "One result per point, in request order", body = BatchResponse),
        (status = 400, description = "Empty or oversized batch", body = ErrorResponse)
    )
)]
pub async fn post_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> impl IntoResponse {
    let start = Instant::now();

    if request.points.is_empty() {
        return bad_request("No points provided".to_string());
    }
    if request.points.len() > state.max_batch_size {
        return bad_request(format!(
            "Too many points (max {})",
            state.max_batch_size
        ));
    }

    let points: Vec<BatchPoint> = request
        .points
        .iter()
        .map(|p| BatchPoint { lat: p.lat, lon: p.lon })
        .collect();

    let results = state
        .service
        .get_batch(&points)
        .into_iter()
        .map(|r| ElevationResponse {
            lat: r.lat,
            lon: r.lon,
            elevation: r.elevation,
        })
        .collect();

    tracing::info!(
        points = points.len(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "Batch elevation query"
    );

    (StatusCode::OK, Json(BatchResponse { results })).into_response()
}

/// Create an error response for elevation queries.
fn error_response(lat: f64, lon: f64, e: GridError) -> axum::response::Response {
    let status = match &e {
        GridError::OutOfBounds { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    tracing::warn!(lat = lat, lon = lon, error = %e, "Elevation query failed");

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn bad_request(message: String) -> axum::response::Response {
    tracing::warn!(error = %message, "Rejected batch request");
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
}

/// Health check endpoint.
///
/// Returns process and request counters. Always reports `ok` once serving.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.service.health();

    Json(HealthResponse {
        status: health.status,
        memory_mb: health.memory_mb,
        threads: health.threads,
        uptime_seconds: health.uptime_seconds,
        total_requests: health.total_requests,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get cache statistics.
///
/// Returns information about the result cache.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "system",
    responses((status = 200, description = "Result cache statistics", body = StatsResponse))
)]
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.service.cache_stats();

    Json(StatsResponse {
        cached_entries: stats.entry_count,
        cache_hits: stats.hit_count,
        cache_misses: stats.miss_count,
        hit_rate: stats.hit_rate(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevation_query_deserialize() {
        let json = r#"{"lat": 35.6812, "lon": 139.7671}"#;
        let query: ElevationQuery = serde_json::from_str(json).unwrap();
        assert_eq!(query.lat, 35.6812);
        assert_eq!(query.lon, 139.7671);
    }

    #[test]
    fn test_batch_request_deserialize() {
        let json = r#"{"points": [{"lat": 35.0, "lon": 139.0}, {"lat": 36.0, "lon": 140.0}]}"#;
        let request: BatchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.points.len(), 2);
        assert_eq!(request.points[1].lon, 140.0);
    }

    #[test]
    fn test_elevation_response_serialize() {
        let response = ElevationResponse {
            lat: 35.3606,
            lon: 138.7274,
            elevation: 327.67,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("327.67"));
        assert!(json.contains("35.3606"));
    }

    #[test]
    fn test_health_response_serialize() {
        let response = HealthResponse {
            status: "ok".to_string(),
            memory_mb: 12,
            threads: 4,
            uptime_seconds: 1.5,
            total_requests: 7,
            version: "0.1.0".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""status":"ok""#));
        assert!(json.contains(r#""total_requests":7"#));
    }
}
