//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::infrastructure::resilience::CircuitMode;
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: Store reachable and its circuit not open
/// - **503 Service Unavailable**: Store unreachable or circuit open
///
/// The cache is reported but never degrades the service, since lookups
/// fall back to the store.
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "store": { "status": "ok", "message": "store:postgres reachable" },
///     "cache": { "status": "ok", "message": "Cache reachable" },
///     "circuit": { "state": "closed", "failures": 0, "half_open_attempts": 0 }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let service = &state.drug_service;

    let store = match service.check_store().await {
        Ok(()) => CheckStatus::ok(format!("{} reachable", service.circuit_key())),
        Err(e) => CheckStatus::error(format!("Store error: {}", e)),
    };

    let cache = if state.cache.health_check().await {
        CheckStatus::ok("Cache reachable")
    } else {
        CheckStatus::error("Cache connection failed")
    };

    let circuit = service.circuit_status().await;
    let healthy = store.is_ok() && circuit.state != CircuitMode::Open;

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            store,
            cache,
            circuit,
        },
    };

    if healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
