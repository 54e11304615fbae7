//! `Cache-Control` policy for API responses.

use axum::{
    extract::Request,
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};

/// Cache lifetime hint by endpoint shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Class and manufacturer listings, 24 hours.
    Long,
    /// A single record, 1 hour.
    Medium,
    /// Paginated search, 5 minutes.
    Short,
    None,
}

impl CachePolicy {
    /// Picks the policy for a request path.
    pub fn for_path(path: &str) -> Self {
        let path = path.trim_end_matches('/');
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

        match segments.as_slice() {
            ["api", "drugs"] => Self::Short,
            ["api", "drugs", slug] if !slug.is_empty() => Self::Medium,
            ["api", "therapeutic-classes"] | ["api", "therapeutic-classes", _] => Self::Long,
            ["api", "manufacturers"] | ["api", "manufacturers", _] => Self::Long,
            _ => Self::None,
        }
    }

    pub fn max_age(&self) -> Option<u64> {
        match self {
            Self::Long => Some(86_400),
            Self::Medium => Some(3_600),
            Self::Short => Some(300),
            Self::None => None,
        }
    }

    pub fn header_value(&self) -> HeaderValue {
        match self.max_age() {
            Some(seconds) => HeaderValue::from_str(&format!("public, max-age={seconds}"))
                .unwrap_or_else(|_| HeaderValue::from_static("no-store")),
            None => HeaderValue::from_static("no-store"),
        }
    }
}

/// Sets `Cache-Control` on every response.
///
/// Successful responses get the path's policy; everything else, errors
/// included, gets `no-store`.
pub async fn layer(req: Request, next: Next) -> Response {
    let policy = CachePolicy::for_path(req.uri().path());
    let mut response = next.run(req).await;

    let value = if response.status().is_success() {
        policy.header_value()
    } else {
        HeaderValue::from_static("no-store")
    };
    response.headers_mut().insert(header::CACHE_CONTROL, value);

    response
}
