//! Circuit breaker for endpoint protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: endpoint assumed down, requests fail fast
//! - Half-Open: testing if endpoint recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Half-Open: after cooldown, on the next acquire
//! Half-Open → Closed: trial attempt succeeds
//! Half-Open → Open: trial attempt fails (cooldown restarts)
//! ```
//!
//! # Design Decisions
//! - One breaker per endpoint identity, never global
//! - Fail fast in Open state (no transport attempt)
//! - Single trial in Half-Open; concurrent callers are rejected, not queued
//! - All transitions happen under one lock per breaker

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub opened_at: Option<Instant>,
}

/// Returned when the breaker refuses a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerRejection {
    /// Time left until a trial is allowed; zero while a trial is in flight.
    pub retry_after: Duration,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    endpoint: String,
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(endpoint: impl Into<String>, failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            failure_threshold: failure_threshold.max(1),
            cooldown,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    pub fn from_config(endpoint: impl Into<String>, config: &CircuitBreakerConfig) -> Self {
        Self::new(endpoint, config.failure_threshold, config.cooldown())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            opened_at: inner.opened_at,
        }
    }

    /// Ask permission for one transport attempt.
    ///
    /// The returned permit must be settled with [`BreakerPermit::success`] or
    /// [`BreakerPermit::failure`]; dropping it unsettled counts as a failure.
    pub fn try_acquire(&self) -> Result<BreakerPermit<'_>, BreakerRejection> {
        let mut inner = self.lock();
        let state = inner.state;
        match state {
            BreakerState::Closed => Ok(BreakerPermit::new(self, false)),
            BreakerState::Open => {
                let opened_at = inner.opened_at.unwrap_or_else(Instant::now);
                let elapsed = opened_at.elapsed();
                if elapsed < self.cooldown {
                    drop(inner);
                    metrics::record_breaker_rejection(&self.endpoint);
                    return Err(BreakerRejection {
                        retry_after: self.cooldown - elapsed,
                    });
                }

                inner.state = BreakerState::HalfOpen;
                inner.trial_in_flight = true;
                drop(inner);
                tracing::info!(endpoint = %self.endpoint, "Circuit breaker half-open, allowing trial call");
                metrics::record_breaker_state(&self.endpoint, BreakerState::HalfOpen);
                Ok(BreakerPermit::new(self, true))
            }
            BreakerState::HalfOpen => {
                if inner.trial_in_flight {
                    drop(inner);
                    metrics::record_breaker_rejection(&self.endpoint);
                    return Err(BreakerRejection {
                        retry_after: Duration::ZERO,
                    });
                }
                inner.trial_in_flight = true;
                Ok(BreakerPermit::new(self, true))
            }
        }
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.lock();
        match (inner.state, trial) {
            (BreakerState::Closed, false) => {
                inner.consecutive_failures = 0;
            }
            (BreakerState::HalfOpen, true) => {
                inner.state = BreakerState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.trial_in_flight = false;
                drop(inner);
                tracing::info!(endpoint = %self.endpoint, "Circuit breaker reset to closed");
                metrics::record_breaker_state(&self.endpoint, BreakerState::Closed);
            }
            // Stale permit from before a transition.
            _ => {}
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut inner = self.lock();
        match (inner.state, trial) {
            (BreakerState::Closed, false) => {
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                if inner.consecutive_failures >= self.failure_threshold {
                    let failures = inner.consecutive_failures;
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                    drop(inner);
                    tracing::warn!(
                        endpoint = %self.endpoint,
                        consecutive_failures = failures,
                        cooldown_ms = self.cooldown.as_millis() as u64,
                        "Circuit breaker opened"
                    );
                    metrics::record_breaker_state(&self.endpoint, BreakerState::Open);
                }
            }
            (BreakerState::HalfOpen, true) => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                inner.trial_in_flight = false;
                inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                drop(inner);
                tracing::warn!(
                    endpoint = %self.endpoint,
                    cooldown_ms = self.cooldown.as_millis() as u64,
                    "Circuit breaker trial failed, reopened"
                );
                metrics::record_breaker_state(&self.endpoint, BreakerState::Open);
            }
            _ => {}
        }
    }

    /// Give back a trial slot without judging the endpoint.
    fn on_abandon(&self, trial: bool) {
        if !trial {
            return;
        }
        let mut inner = self.lock();
        if inner.state == BreakerState::HalfOpen {
            inner.trial_in_flight = false;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Permission for exactly one transport attempt.
#[derive(Debug)]
#[must_use = "a dropped permit is recorded as a failure"]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> BreakerPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    /// Whether this permit is the half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial);
    }

    /// Release the permit without recording an outcome (caller cancelled).
    pub fn abandon(mut self) {
        self.settled = true;
        self.breaker.on_abandon(self.trial);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_failure(self.trial);
        }
    }
}
