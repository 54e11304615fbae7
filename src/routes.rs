//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET /health` - Health check: store, cache, circuit state
//! - `/api/*`      - Read-only REST API
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Cache-Control** - Per-endpoint cache lifetime hints
//! - **Rate limiting** - Per-IP token bucket (configurable for proxy deployments)
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::rate_limit::{self, RateLimitSettings};
use crate::api::middleware::{cache_control, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Routes and middleware shared by every deployment, without rate limiting.
///
/// Integration tests drive this router directly, as they have no peer
/// address for the limiter to key on.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api::routes::api_routes())
        .with_state(state)
        .layer(middleware::from_fn(cache_control::layer))
        .layer(tracing::layer())
}

/// Constructs the application router with all routes and middleware.
///
/// # Arguments
///
/// - `state` - shared application state injected into all handlers
/// - `limits` - per-IP token bucket settings
/// - `behind_proxy` - when `true`, rate limiting reads client IP from
///   `X-Forwarded-For` / `X-Real-IP` headers instead of the peer socket address;
///   enable only when the service runs behind a trusted reverse proxy
pub fn app_router(
    state: AppState,
    limits: RateLimitSettings,
    behind_proxy: bool,
) -> NormalizePath<Router> {
    let router = build_router(state);
    let router = if behind_proxy {
        router.layer(rate_limit::proxied_layer(limits))
    } else {
        router.layer(rate_limit::layer(limits))
    };

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
