//! Keyed circuit breaker for calls to flaky dependencies.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerOptions {
    /// Consecutive failures that open a closed circuit.
    pub failure_threshold: u32,
    /// Time an open circuit rejects calls before allowing trial calls.
    pub reset_timeout: Duration,
    /// Trial calls admitted while half-open.
    pub half_open_max_attempts: u32,
}

impl Default for CircuitBreakerOptions {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_millis(60_000),
            half_open_max_attempts: 3,
        }
    }
}

/// Position of a circuit in the breaker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitMode {
    Closed,
    Open,
    HalfOpen,
}

/// Mutable state of one protected dependency.
#[derive(Debug, Clone)]
struct CircuitState {
    mode: CircuitMode,
    failures: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    half_open_attempts: u32,
    /// Bumped on every mode change; outcomes of calls admitted under an
    /// earlier generation are discarded.
    generation: u64,
}

impl CircuitState {
    fn new() -> Self {
        Self {
            mode: CircuitMode::Closed,
            failures: 0,
            last_failure: None,
            last_failure_at: None,
            half_open_attempts: 0,
            generation: 0,
        }
    }

    fn transition(&mut self, mode: CircuitMode) {
        self.mode = mode;
        self.generation = self.generation.wrapping_add(1);
    }

    fn clear(&mut self) {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            generation,
            ..Self::new()
        };
    }

    fn status(&self) -> CircuitStatus {
        CircuitStatus {
            state: self.mode,
            failures: self.failures,
            last_failure_at: self.last_failure_at,
            half_open_attempts: self.half_open_attempts,
        }
    }
}

/// Point-in-time snapshot of a circuit, for health reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitStatus {
    pub state: CircuitMode,
    pub failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<DateTime<Utc>>,
    pub half_open_attempts: u32,
}

impl CircuitStatus {
    fn closed() -> Self {
        CircuitState::new().status()
    }
}

/// Outcome of a guarded call that did not succeed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CircuitError<E> {
    /// The circuit rejected the call without running it.
    #[error("circuit '{key}' is open")]
    Open { key: String },

    /// The operation ran and failed.
    #[error("{0}")]
    Inner(E),
}

/// Circuit breaker holding independent state per dependency key.
///
/// State lives for the life of the breaker and is created lazily on the first
/// call for a key. The breaker is shared between requests behind an `Arc`;
/// each key's state is updated under its own lock, and the lock is never held
/// while the guarded operation runs.
pub struct CircuitBreaker {
    defaults: CircuitBreakerOptions,
    circuits: RwLock<HashMap<String, Arc<Mutex<CircuitState>>>>,
}

impl CircuitBreaker {
    pub fn new(defaults: CircuitBreakerOptions) -> Self {
        Self {
            defaults,
            circuits: RwLock::new(HashMap::new()),
        }
    }

    pub fn defaults(&self) -> &CircuitBreakerOptions {
        &self.defaults
    }

    /// Runs `operation` under the circuit for `key` using the default options.
    ///
    /// # Errors
    ///
    /// Returns [`CircuitError::Open`] without invoking `operation` when the
    /// circuit is open, or [`CircuitError::Inner`] when the operation fails.
    pub async fn call<T, E, F, Fut>(&self, key: &str, operation: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let options = self.defaults;
        self.call_with_options(key, &options, operation).await
    }

    /// Runs `operation` under the circuit for `key` with explicit options.
    pub async fn call_with_options<T, E, F, Fut>(
        &self,
        key: &str,
        options: &CircuitBreakerOptions,
        operation: F,
    ) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let circuit = self.circuit(key).await;

        let Some(generation) = Self::admit(&circuit, key, options).await else {
            counter!("circuit_breaker_rejections_total", "key" => key.to_string()).increment(1);
            debug!(circuit = key, "Call rejected, circuit open");
            return Err(CircuitError::Open {
                key: key.to_string(),
            });
        };

        match operation().await {
            Ok(value) => {
                Self::on_success(&circuit, key, generation).await;
                Ok(value)
            }
            Err(err) => {
                Self::on_failure(&circuit, key, options, generation).await;
                Err(CircuitError::Inner(err))
            }
        }
    }

    /// Current status of `key`; unknown keys report a fresh closed circuit.
    pub async fn status(&self, key: &str) -> CircuitStatus {
        let circuit = self.circuits.read().await.get(key).cloned();
        match circuit {
            Some(circuit) => circuit.lock().await.status(),
            None => CircuitStatus::closed(),
        }
    }

    /// Status of every circuit seen so far, keyed by dependency.
    pub async fn statuses(&self) -> HashMap<String, CircuitStatus> {
        let circuits: Vec<(String, Arc<Mutex<CircuitState>>)> = self
            .circuits
            .read()
            .await
            .iter()
            .map(|(key, circuit)| (key.clone(), circuit.clone()))
            .collect();

        let mut statuses = HashMap::with_capacity(circuits.len());
        for (key, circuit) in circuits {
            statuses.insert(key, circuit.lock().await.status());
        }
        statuses
    }

    /// Returns `key` to a closed circuit with no recorded failures.
    pub async fn reset(&self, key: &str) {
        let circuit = self.circuits.read().await.get(key).cloned();
        if let Some(circuit) = circuit {
            circuit.lock().await.clear();
            info!(circuit = key, "Circuit reset");
        }
    }

    /// Resets every circuit.
    pub async fn reset_all(&self) {
        let circuits: Vec<Arc<Mutex<CircuitState>>> =
            self.circuits.read().await.values().cloned().collect();
        for circuit in circuits {
            circuit.lock().await.clear();
        }
        info!("All circuits reset");
    }

    async fn circuit(&self, key: &str) -> Arc<Mutex<CircuitState>> {
        if let Some(circuit) = self.circuits.read().await.get(key) {
            return circuit.clone();
        }

        self.circuits
            .write()
            .await
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(CircuitState::new())))
            .clone()
    }

    /// Decides whether a call may proceed, moving an expired open circuit to
    /// half-open and counting half-open trial calls. Returns the generation
    /// the call was admitted under.
    async fn admit(
        circuit: &Mutex<CircuitState>,
        key: &str,
        options: &CircuitBreakerOptions,
    ) -> Option<u64> {
        let mut state = circuit.lock().await;

        if state.mode == CircuitMode::Open {
            let expired = state
                .last_failure
                .is_none_or(|at| at.elapsed() >= options.reset_timeout);
            if !expired {
                return None;
            }
            state.transition(CircuitMode::HalfOpen);
            state.half_open_attempts = 0;
            info!(circuit = key, "Circuit half-open, allowing trial calls");
        }

        match state.mode {
            CircuitMode::Closed => Some(state.generation),
            CircuitMode::HalfOpen if state.half_open_attempts < options.half_open_max_attempts => {
                state.half_open_attempts += 1;
                Some(state.generation)
            }
            _ => None,
        }
    }

    async fn on_success(circuit: &Mutex<CircuitState>, key: &str, generation: u64) {
        let mut state = circuit.lock().await;
        if state.generation != generation {
            debug!(circuit = key, "Ignoring outcome of a call admitted before the last transition");
            return;
        }

        if state.mode == CircuitMode::HalfOpen {
            state.transition(CircuitMode::Closed);
            state.half_open_attempts = 0;
            info!(circuit = key, "Trial call succeeded, circuit closed");
        }
        state.failures = 0;
    }

    async fn on_failure(
        circuit: &Mutex<CircuitState>,
        key: &str,
        options: &CircuitBreakerOptions,
        generation: u64,
    ) {
        let mut state = circuit.lock().await;
        if state.generation != generation {
            debug!(circuit = key, "Ignoring outcome of a call admitted before the last transition");
            return;
        }

        state.failures += 1;
        state.last_failure = Some(Instant::now());
        state.last_failure_at = Some(Utc::now());

        let should_open = match state.mode {
            CircuitMode::Closed => state.failures >= options.failure_threshold,
            CircuitMode::HalfOpen => state.half_open_attempts >= options.half_open_max_attempts,
            CircuitMode::Open => false,
        };

        if should_open {
            state.transition(CircuitMode::Open);
            counter!("circuit_breaker_opened_total", "key" => key.to_string()).increment(1);
            warn!(
                circuit = key,
                failures = state.failures,
                "Circuit opened after repeated failures"
            );
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn options() -> CircuitBreakerOptions {
        CircuitBreakerOptions {
            failure_threshold: 3,
            reset_timeout: Duration::from_millis(1_000),
            half_open_max_attempts: 1,
        }
    }

    async fn fail(breaker: &CircuitBreaker, key: &str) -> Result<(), CircuitError<&'static str>> {
        breaker.call(key, || async { Err::<(), _>("boom") }).await
    }

    async fn succeed(breaker: &CircuitBreaker, key: &str) -> Result<u32, CircuitError<&'static str>> {
        breaker.call(key, || async { Ok::<_, &'static str>(7) }).await
    }

    #[tokio::test]
    async fn test_passes_through_when_closed() {
        let breaker = CircuitBreaker::new(options());

        assert_eq!(succeed(&breaker, "store").await, Ok(7));
        assert_eq!(
            fail(&breaker, "store").await,
            Err(CircuitError::Inner("boom"))
        );

        let status = breaker.status("store").await;
        assert_eq!(status.state, CircuitMode::Closed);
        assert_eq!(status.failures, 1);
        assert!(status.last_failure_at.is_some());
    }

    #[tokio::test]
    async fn test_opens_at_threshold_and_skips_operation() {
        let breaker = CircuitBreaker::new(options());
        for _ in 0..3 {
            let _ = fail(&breaker, "store").await;
        }
        assert_eq!(breaker.status("store").await.state, CircuitMode::Open);

        let invoked = AtomicUsize::new(0);
        let result = breaker
            .call("store", || async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &'static str>(())
            })
            .await;

        assert_eq!(
            result,
            Err(CircuitError::Open {
                key: "store".to_string()
            })
        );
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_failures() {
        let breaker = CircuitBreaker::new(options());
        let _ = fail(&breaker, "store").await;
        let _ = fail(&breaker, "store").await;
        let _ = succeed(&breaker, "store").await;
        let _ = fail(&breaker, "store").await;
        let _ = fail(&breaker, "store").await;

        let status = breaker.status("store").await;
        assert_eq!(status.state, CircuitMode::Closed);
        assert_eq!(status.failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_trial_call_after_reset_timeout() {
        let breaker = CircuitBreaker::new(options());
        for _ in 0..3 {
            let _ = fail(&breaker, "store").await;
        }

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(matches!(
            succeed(&breaker, "store").await,
            Err(CircuitError::Open { .. })
        ));

        tokio::time::advance(Duration::from_millis(1)).await;
        let invoked = AtomicUsize::new(0);
        let trial = breaker
            .call("store", || async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("still down")
            })
            .await;
        assert_eq!(trial, Err(CircuitError::Inner("still down")));
        assert_eq!(invoked.load(Ordering::SeqCst), 1);

        assert_eq!(breaker.status("store").await.state, CircuitMode::Open);
        assert!(matches!(
            succeed(&breaker, "store").await,
            Err(CircuitError::Open { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_success_closes() {
        let breaker = CircuitBreaker::new(options());
        for _ in 0..3 {
            let _ = fail(&breaker, "store").await;
        }
        tokio::time::advance(Duration::from_millis(1_000)).await;

        assert_eq!(succeed(&breaker, "store").await, Ok(7));

        let status = breaker.status("store").await;
        assert_eq!(status.state, CircuitMode::Closed);
        assert_eq!(status.failures, 0);
        assert_eq!(succeed(&breaker, "store").await, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_allows_configured_attempts() {
        let breaker = CircuitBreaker::new(CircuitBreakerOptions {
            half_open_max_attempts: 3,
            ..options()
        });
        for _ in 0..3 {
            let _ = fail(&breaker, "store").await;
        }
        tokio::time::advance(Duration::from_millis(1_000)).await;

        assert_eq!(fail(&breaker, "store").await, Err(CircuitError::Inner("boom")));
        assert_eq!(breaker.status("store").await.state, CircuitMode::HalfOpen);
        assert_eq!(fail(&breaker, "store").await, Err(CircuitError::Inner("boom")));
        assert_eq!(fail(&breaker, "store").await, Err(CircuitError::Inner("boom")));

        let status = breaker.status("store").await;
        assert_eq!(status.state, CircuitMode::Open);
        assert_eq!(status.half_open_attempts, 3);
        assert!(matches!(
            fail(&breaker, "store").await,
            Err(CircuitError::Open { .. })
        ));
    }

    /// Starts a call under `key` that stays in flight until the returned
    /// sender fires, and waits until the breaker has admitted it.
    async fn start_slow_call(
        breaker: &Arc<CircuitBreaker>,
        key: &'static str,
    ) -> (
        tokio::sync::oneshot::Sender<Result<u32, &'static str>>,
        tokio::task::JoinHandle<Result<u32, CircuitError<&'static str>>>,
    ) {
        let (release_tx, release_rx) = tokio::sync::oneshot::channel();
        let (admitted_tx, admitted_rx) = tokio::sync::oneshot::channel::<()>();
        let task_breaker = Arc::clone(breaker);
        let handle = tokio::spawn(async move {
            task_breaker
                .call(key, move || async move {
                    let _ = admitted_tx.send(());
                    release_rx.await.unwrap_or(Err("dropped"))
                })
                .await
        });
        admitted_rx.await.unwrap();
        (release_tx, handle)
    }

    #[tokio::test]
    async fn test_late_success_does_not_close_open_circuit() {
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerOptions {
            failure_threshold: 2,
            ..options()
        }));
        let (release, slow) = start_slow_call(&breaker, "store").await;

        let _ = fail(&breaker, "store").await;
        let _ = fail(&breaker, "store").await;
        assert_eq!(breaker.status("store").await.state, CircuitMode::Open);

        release.send(Ok(1)).unwrap();
        assert_eq!(slow.await.unwrap(), Ok(1));

        let status = breaker.status("store").await;
        assert_eq!(status.state, CircuitMode::Open);
        assert_eq!(status.failures, 2);
        assert!(matches!(
            succeed(&breaker, "store").await,
            Err(CircuitError::Open { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_failure_does_not_extend_cooldown() {
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerOptions {
            failure_threshold: 2,
            ..options()
        }));
        let (release, slow) = start_slow_call(&breaker, "store").await;

        let _ = fail(&breaker, "store").await;
        let _ = fail(&breaker, "store").await;
        let opened_at = breaker.status("store").await.last_failure_at;

        tokio::time::advance(Duration::from_millis(600)).await;
        release.send(Err("late")).unwrap();
        assert_eq!(slow.await.unwrap(), Err(CircuitError::Inner("late")));

        let status = breaker.status("store").await;
        assert_eq!(status.failures, 2);
        assert_eq!(status.last_failure_at, opened_at);

        tokio::time::advance(Duration::from_millis(400)).await;
        assert_eq!(succeed(&breaker, "store").await, Ok(7));
        assert_eq!(breaker.status("store").await.state, CircuitMode::Closed);
    }

    #[tokio::test]
    async fn test_call_admitted_before_reset_is_ignored() {
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerOptions {
            failure_threshold: 1,
            ..options()
        }));
        let (release, slow) = start_slow_call(&breaker, "store").await;

        breaker.reset("store").await;
        release.send(Err("late")).unwrap();
        let _ = slow.await.unwrap();

        assert_eq!(breaker.status("store").await, CircuitStatus::closed());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let breaker = CircuitBreaker::new(options());
        for _ in 0..3 {
            let _ = fail(&breaker, "store").await;
        }

        assert_eq!(breaker.status("store").await.state, CircuitMode::Open);
        assert_eq!(succeed(&breaker, "enrichment").await, Ok(7));
        assert_eq!(
            breaker.status("enrichment").await.state,
            CircuitMode::Closed
        );
    }

    #[tokio::test]
    async fn test_reset_and_reset_all() {
        let breaker = CircuitBreaker::new(options());
        for _ in 0..3 {
            let _ = fail(&breaker, "a").await;
            let _ = fail(&breaker, "b").await;
        }

        breaker.reset("a").await;
        assert_eq!(breaker.status("a").await.state, CircuitMode::Closed);
        assert_eq!(breaker.status("b").await.state, CircuitMode::Open);

        breaker.reset_all().await;
        assert_eq!(breaker.status("b").await, CircuitStatus::closed());
    }

    #[tokio::test]
    async fn test_unknown_key_reports_closed() {
        let breaker = CircuitBreaker::default();
        assert_eq!(breaker.status("never-called").await, CircuitStatus::closed());
        assert!(breaker.statuses().await.is_empty());
    }

    #[tokio::test]
    async fn test_per_call_options_override_defaults() {
        let breaker = CircuitBreaker::default();
        let strict = CircuitBreakerOptions {
            failure_threshold: 1,
            ..CircuitBreakerOptions::default()
        };

        let _ = breaker
            .call_with_options("store", &strict, || async { Err::<(), _>("boom") })
            .await;

        assert_eq!(breaker.status("store").await.state, CircuitMode::Open);
    }
}
