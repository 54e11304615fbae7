//! HTTP middleware for request processing and protection.
//!
//! Provides rate limiting, cache-control headers and observability middleware.

pub mod cache_control;
pub mod rate_limit;
pub mod tracing;
