//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete record stores, caching and the resilience wrappers every store
//! call goes through.
//!
//! # Modules
//!
//! - [`cache`] - Single-record cache (Redis and no-op implementations)
//! - [`persistence`] - PostgreSQL and flat-file record stores
//! - [`resilience`] - Circuit breaker and retry with backoff

pub mod cache;
pub mod persistence;
pub mod resilience;
