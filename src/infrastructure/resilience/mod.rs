//! Resilience wrappers for calls to the record store.
//!
//! Both wrappers are explicit higher-order functions composed at the call
//! site: [`CircuitBreaker::call`] around [`with_retry`] around the store
//! operation, so an exhausted retry sequence counts as one breaker failure.

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerOptions, CircuitError, CircuitMode, CircuitStatus,
};
pub use retry::{RetryCondition, RetryOptions, TransientFailure, with_retry};
