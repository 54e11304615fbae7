//! Rate limiting middleware using token bucket algorithm.

use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor},
};

/// Token bucket settings shared by both limiter flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Sustained requests per second per client.
    pub per_second: u64,
    /// Requests a client may make in a burst before being throttled.
    pub burst: u32,
}

impl RateLimitSettings {
    /// Replenish interval for one token.
    fn period_ms(&self) -> u64 {
        (1_000 / self.per_second.max(1)).max(1)
    }
}

/// Creates a per-IP rate limiter keyed on the socket peer address.
///
/// Requests exceeding the limit receive `429 Too Many Requests`.
///
/// # Panics
///
/// Panics if `burst` is zero; configuration validation rejects that at
/// startup.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/api/drugs", get(list_drugs_handler))
///     .layer(rate_limit::layer(RateLimitSettings { per_second: 10, burst: 100 }));
/// ```
pub fn layer(
    settings: RateLimitSettings,
) -> GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(settings.period_ms())
            .burst_size(settings.burst)
            .finish()
            .expect("rate limit settings are validated at startup"),
    );

    GovernorLayer::new(governor_conf)
}

/// Creates a per-IP rate limiter for deployments behind a reverse proxy.
///
/// The client IP is read from `X-Forwarded-For`, `X-Real-IP` or `Forwarded`,
/// falling back to the peer address.
pub fn proxied_layer(
    settings: RateLimitSettings,
) -> GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body> {
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .per_millisecond(settings.period_ms())
            .burst_size(settings.burst)
            .finish()
            .expect("rate limit settings are validated at startup"),
    );

    GovernorLayer::new(governor_conf)
}
