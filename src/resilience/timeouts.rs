//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the whole call (all attempts and backoff waits) by one budget
//! - Bound each transport attempt by its own limit, never past the call budget
//! - Cancel the in-flight future cleanly when a limit is hit
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Elapsed time is cumulative from the start of the call, never reset
//! - An attempt cut short by the call budget reports the call scope

use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout, Instant};

use crate::config::TimeoutConfig;
use crate::error::TimeoutScope;

/// Attempt and whole-call limits for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub attempt: Duration,
    pub call: Duration,
}

impl TimeoutPolicy {
    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self {
            attempt: Duration::from_millis(config.attempt_ms),
            call: Duration::from_millis(config.call_ms),
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            attempt: Duration::from_secs(30),
            call: Duration::from_secs(30),
        }
    }
}

/// Error returned when a guarded future ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed {
    pub scope: TimeoutScope,
    pub after: Duration,
}

/// Wall-clock budget for one call, started when the call begins.
#[derive(Debug, Clone, Copy)]
pub struct CallDeadline {
    started: Instant,
    budget: Duration,
}

impl CallDeadline {
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed())
    }

    /// Whether waiting `delay` would still leave time for another attempt.
    pub fn allows_wait(&self, delay: Duration) -> bool {
        delay < self.remaining()
    }

    /// Run the whole call under the budget.
    pub async fn guard_call<F: Future>(&self, fut: F) -> Result<F::Output, Elapsed> {
        timeout(self.remaining(), fut).await.map_err(|_| Elapsed {
            scope: TimeoutScope::Call,
            after: self.budget,
        })
    }

    /// Run one attempt under `min(attempt_limit, remaining budget)`.
    pub async fn guard_attempt<F: Future>(
        &self,
        attempt_limit: Duration,
        fut: F,
    ) -> Result<F::Output, Elapsed> {
        let remaining = self.remaining();
        let (limit, scope) = if attempt_limit < remaining {
            (attempt_limit, TimeoutScope::Attempt)
        } else {
            (remaining, TimeoutScope::Call)
        };

        timeout(limit, fut).await.map_err(|_| Elapsed {
            scope,
            after: match scope {
                TimeoutScope::Attempt => attempt_limit,
                TimeoutScope::Call => self.budget,
            },
        })
    }
}
