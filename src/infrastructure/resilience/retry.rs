//! Retry with exponential backoff for fallible async operations.

use crate::domain::repositories::StoreError;
use metrics::counter;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::RetryIf;
use tracing::warn;

/// Decides whether a caught error is worth another attempt.
pub type RetryCondition<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Error classes the retry specializations select on.
pub trait TransientFailure {
    /// Timeouts and connection resets.
    fn is_timeout_or_reset(&self) -> bool;

    /// Failures to reach a database at all.
    fn is_connectivity(&self) -> bool;
}

impl TransientFailure for StoreError {
    fn is_timeout_or_reset(&self) -> bool {
        StoreError::is_timeout_or_reset(self)
    }

    fn is_connectivity(&self) -> bool {
        StoreError::is_connectivity(self)
    }
}

/// Retry policy for [`with_retry`].
pub struct RetryOptions<E> {
    /// Total attempts including the first one.
    pub max_attempts: usize,
    /// Delay before the first retry.
    pub backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Double the delay after every failed attempt.
    pub exponential: bool,
    retry_condition: RetryCondition<E>,
}

impl<E> RetryOptions<E> {
    /// Creates a policy that retries every error.
    pub fn new(max_attempts: usize, backoff: Duration, max_backoff: Duration, exponential: bool) -> Self {
        Self {
            max_attempts,
            backoff,
            max_backoff,
            exponential,
            retry_condition: Arc::new(|_| true),
        }
    }

    /// Restricts retries to errors matching `condition`.
    pub fn retry_if(mut self, condition: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.retry_condition = Arc::new(condition);
        self
    }

    pub fn should_retry(&self, err: &E) -> bool {
        (self.retry_condition)(err)
    }

    /// Delays slept between consecutive attempts.
    ///
    /// Yields `max_attempts - 1` values: `min(backoff * 2^(n-1), max_backoff)`
    /// for the n-th retry in exponential mode, `backoff` otherwise.
    pub fn delays(&self) -> Vec<Duration> {
        let retries = self.max_attempts.saturating_sub(1);
        (0..retries)
            .map(|n| {
                if self.exponential {
                    let factor = 2u32.saturating_pow(u32::try_from(n).unwrap_or(u32::MAX));
                    self.backoff.saturating_mul(factor).min(self.max_backoff)
                } else {
                    self.backoff
                }
            })
            .collect()
    }
}

impl<E: TransientFailure + 'static> RetryOptions<E> {
    /// Retries only timeouts and connection resets.
    pub fn on_network_errors(self) -> Self {
        self.retry_if(|err: &E| err.is_timeout_or_reset())
    }

    /// Retries only database connectivity failures.
    pub fn on_database_errors(self) -> Self {
        self.retry_if(|err: &E| err.is_connectivity())
    }
}

impl<E> Default for RetryOptions<E> {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1_000), Duration::from_millis(30_000), true)
    }
}

impl<E> Clone for RetryOptions<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            max_backoff: self.max_backoff,
            exponential: self.exponential,
            retry_condition: self.retry_condition.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("max_backoff", &self.max_backoff)
            .field("exponential", &self.exponential)
            .finish_non_exhaustive()
    }
}

/// Runs `operation`, retrying failures allowed by `options`.
///
/// A failure rejected by the retry condition is returned at once without
/// consuming further attempts. Once attempts are exhausted the last error is
/// returned.
pub async fn with_retry<T, E, F, Fut>(options: &RetryOptions<E>, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let condition = options.retry_condition.clone();

    RetryIf::spawn(options.delays(), operation, move |err: &E| {
        let retryable = condition(err);
        if retryable {
            counter!("store_retries_total").increment(1);
        }
        warn!(error = %err, retryable, "Operation failed");
        retryable
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_default_delays() {
        let options = RetryOptions::<StoreError>::default();
        assert_eq!(options.delays(), vec![ms(1_000), ms(2_000)]);
    }

    #[test]
    fn test_exponential_delays_are_capped() {
        let options = RetryOptions::<StoreError>::new(6, ms(1_000), ms(5_000), true);
        assert_eq!(
            options.delays(),
            vec![ms(1_000), ms(2_000), ms(4_000), ms(5_000), ms(5_000)]
        );
    }

    #[test]
    fn test_fixed_delays() {
        let options = RetryOptions::<StoreError>::new(4, ms(250), ms(30_000), false);
        assert_eq!(options.delays(), vec![ms(250); 3]);
    }

    #[test]
    fn test_single_attempt_has_no_delays() {
        assert!(RetryOptions::<StoreError>::new(1, ms(10), ms(10), true).delays().is_empty());
        assert!(RetryOptions::<StoreError>::new(0, ms(10), ms(10), true).delays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_failures_with_backoff() {
        let options = RetryOptions::<StoreError>::new(3, ms(100), ms(30_000), true);
        let attempts = Mutex::new(Vec::new());
        let start = Instant::now();

        let result = with_retry(&options, || {
            let mut seen = attempts.lock().unwrap();
            seen.push(start.elapsed());
            let n = seen.len();
            async move {
                if n < 3 {
                    Err(StoreError::Timeout("slow".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        let seen = attempts.into_inner().unwrap();
        assert_eq!(seen, vec![ms(0), ms(100), ms(300)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_return_last_error() {
        let options = RetryOptions::<StoreError>::new(3, ms(10), ms(100), true);
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = with_retry(&options, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Err(StoreError::Connectivity(format!("attempt {n}"))) }
        })
        .await;

        assert_eq!(result, Err(StoreError::Connectivity("attempt 3".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_is_returned_immediately() {
        let options = RetryOptions::<StoreError>::default().on_database_errors();
        let calls = AtomicUsize::new(0);
        let start = Instant::now();

        let result: Result<(), _> = with_retry(&options, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Backend("bad query".into())) }
        })
        .await;

        assert_eq!(result, Err(StoreError::Backend("bad query".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_network_specialization() {
        let options = RetryOptions::<StoreError>::default().on_network_errors();
        assert!(options.should_retry(&StoreError::Timeout("t".into())));
        assert!(options.should_retry(&StoreError::ConnectionReset("r".into())));
        assert!(!options.should_retry(&StoreError::Connectivity("c".into())));
        assert!(!options.should_retry(&StoreError::Backend("b".into())));
    }

    #[test]
    fn test_database_specialization() {
        let options = RetryOptions::<StoreError>::default().on_database_errors();
        assert!(options.should_retry(&StoreError::Connectivity("c".into())));
        assert!(options.should_retry(&StoreError::Timeout("t".into())));
        assert!(!options.should_retry(&StoreError::Backend("b".into())));
    }
}
