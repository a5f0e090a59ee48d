//! Circuit breaker for service protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: service assumed down, requests fail fast
//! - Half-Open: testing if service recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure rate >= threshold over the last `sliding_window_size` calls
//!                (evaluated once `minimum_calls` outcomes are recorded)
//! Open → Half-Open: after reset timeout
//! Half-Open → Closed: trial request succeeds
//! Half-Open → Open: trial request fails
//! ```
//!
//! # Design Decisions
//! - Per-service circuit breaker (instance failures are the forwarder's job)
//! - Fail fast in Open state (no network activity)
//! - Single trial in Half-Open; a dropped trial counts as a failure

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::error::GatewayError;
use crate::observability::metrics;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Tripping and recovery policy.
#[derive(Debug, Clone)]
pub struct CircuitBreakerPolicy {
    /// Failure percentage (0-100] at which the circuit opens.
    pub failure_rate_threshold: f64,
    /// Number of most recent calls considered.
    pub sliding_window_size: usize,
    /// Calls required before the failure rate is evaluated.
    pub minimum_calls: usize,
    /// Time spent Open before a trial is allowed.
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerPolicy {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            sliding_window_size: 10,
            minimum_calls: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&CircuitBreakerConfig> for CircuitBreakerPolicy {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_rate_threshold: config.failure_rate_threshold,
            sliding_window_size: config.sliding_window_size,
            minimum_calls: config.minimum_calls,
            reset_timeout: Duration::from_secs(config.reset_timeout_secs),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    /// Outcomes of recent closed-state calls, true = failure.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// A circuit breaker guarding calls to one service.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    policy: CircuitBreakerPolicy,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, policy: CircuitBreakerPolicy) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                window: VecDeque::with_capacity(policy.sliding_window_size),
                opened_at: None,
                trial_in_flight: false,
            }),
            policy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, reporting Half-Open once the reset timeout has elapsed.
    pub fn state(&self) -> CircuitState {
        let inner = self.lock();
        match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(at)) if at.elapsed() >= self.policy.reset_timeout => {
                CircuitState::HalfOpen
            }
            (state, _) => state,
        }
    }

    /// Run `call` through the breaker.
    ///
    /// Returns `CircuitOpen` without invoking `call` when the circuit rejects it.
    /// Errors for which [`GatewayError::is_service_failure`] holds count as failures.
    pub async fn call<F, Fut, T>(&self, call: F) -> Result<T, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let Some(mut permit) = self.try_acquire() else {
            return Err(GatewayError::CircuitOpen {
                service: self.name.clone(),
            });
        };

        let result = call().await;
        match &result {
            Err(e) if e.is_service_failure() => permit.complete(false),
            _ => permit.complete(true),
        }
        result
    }

    fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Some(Permit::new(self, false)),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.policy.reset_timeout)
                    .unwrap_or(true);
                if !elapsed {
                    return None;
                }
                self.transition(&mut inner, CircuitState::HalfOpen);
                inner.trial_in_flight = true;
                Some(Permit::new(self, true))
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    return None;
                }
                inner.trial_in_flight = true;
                Some(Permit::new(self, true))
            }
        }
    }

    fn record(&self, trial: bool, success: bool) {
        let mut inner = self.lock();

        if trial {
            inner.trial_in_flight = false;
            if success {
                inner.window.clear();
                inner.opened_at = None;
                self.transition(&mut inner, CircuitState::Closed);
            } else {
                inner.opened_at = Some(Instant::now());
                self.transition(&mut inner, CircuitState::Open);
            }
            return;
        }

        // A late closed-state outcome after another call tripped the circuit.
        if inner.state != CircuitState::Closed {
            return;
        }

        if inner.window.len() == self.policy.sliding_window_size {
            inner.window.pop_front();
        }
        inner.window.push_back(!success);

        if inner.window.len() >= self.policy.minimum_calls {
            let failures = inner.window.iter().filter(|f| **f).count();
            let rate = failures as f64 * 100.0 / inner.window.len() as f64;
            if rate >= self.policy.failure_rate_threshold {
                tracing::warn!(
                    service = %self.name,
                    failure_rate = rate,
                    calls = inner.window.len(),
                    "Failure rate above threshold"
                );
                inner.window.clear();
                inner.opened_at = Some(Instant::now());
                self.transition(&mut inner, CircuitState::Open);
            }
        }
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState) {
        if inner.state == to {
            return;
        }
        match to {
            CircuitState::Open => tracing::warn!(service = %self.name, from = ?inner.state, "Circuit opened"),
            _ => tracing::info!(service = %self.name, from = ?inner.state, to = ?to, "Circuit state changed"),
        }
        inner.state = to;
        metrics::record_circuit_state(&self.name, to);
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Admission to make one call. Dropping it unfinished records a failure.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    done: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self { breaker, trial, done: false }
    }

    fn complete(&mut self, success: bool) {
        self.done = true;
        self.breaker.record(self.trial, success);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.done && self.trial {
            self.breaker.record(true, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    fn policy() -> CircuitBreakerPolicy {
        CircuitBreakerPolicy {
            failure_rate_threshold: 50.0,
            sliding_window_size: 4,
            minimum_calls: 4,
            reset_timeout: Duration::from_secs(10),
        }
    }

    fn exhausted() -> GatewayError {
        GatewayError::AllInstancesExhausted {
            service: "user".into(),
            attempts: 2,
            source: TransportError::Connect("refused".into()),
        }
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), GatewayError> {
        cb.call(|| async { Err::<(), _>(exhausted()) }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<(), GatewayError> {
        cb.call(|| async { Ok(()) }).await
    }

    #[tokio::test]
    async fn test_stays_closed_below_minimum_calls() {
        let cb = CircuitBreaker::new("user", policy());
        for _ in 0..3 {
            assert!(fail(&cb).await.is_err());
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_opens_at_threshold_and_short_circuits() {
        let cb = CircuitBreaker::new("user", policy());
        succeed(&cb).await.unwrap();
        succeed(&cb).await.unwrap();
        fail(&cb).await.unwrap_err();
        fail(&cb).await.unwrap_err();
        assert_eq!(cb.state(), CircuitState::Open);

        let mut invoked = false;
        let result = cb
            .call(|| {
                invoked = true;
                async { Ok(()) }
            })
            .await;
        assert!(matches!(result, Err(GatewayError::CircuitOpen { .. })));
        assert!(!invoked);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let cb = CircuitBreaker::new("user", policy());
        fail(&cb).await.unwrap_err();
        for _ in 0..6 {
            succeed(&cb).await.unwrap();
        }
        fail(&cb).await.unwrap_err();
        // Window now holds [ok, ok, ok, fail]: 25% failure rate.
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_trial_success_closes() {
        let cb = CircuitBreaker::new("user", policy());
        for _ in 0..4 {
            fail(&cb).await.unwrap_err();
        }
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_trial_failure_reopens() {
        let cb = CircuitBreaker::new("user", policy());
        for _ in 0..4 {
            fail(&cb).await.unwrap_err();
        }
        tokio::time::advance(Duration::from_secs(11)).await;

        assert!(matches!(fail(&cb).await, Err(GatewayError::AllInstancesExhausted { .. })));
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(matches!(succeed(&cb).await, Err(GatewayError::CircuitOpen { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_trial_in_half_open() {
        let cb = CircuitBreaker::new("user", policy());
        for _ in 0..4 {
            fail(&cb).await.unwrap_err();
        }
        tokio::time::advance(Duration::from_secs(11)).await;

        let permit = cb.try_acquire().expect("trial permitted");
        assert!(cb.try_acquire().is_none());

        // Abandoned trial counts as a failure.
        drop(permit);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_method_errors_do_not_count() {
        let cb = CircuitBreaker::new("user", policy());
        for _ in 0..8 {
            let result = cb
                .call(|| async {
                    Err::<(), _>(GatewayError::MethodNotAllowed(axum::http::Method::PATCH))
                })
                .await;
            assert!(result.is_err());
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
