//! Retry logic.
//!
//! # Responsibilities
//! - Classify each attempt as success, transient or permanent failure
//! - Re-issue transient failures with exponential backoff
//! - Stop when retries are exhausted, the call budget cannot fit another
//!   wait, or the caller cancels
//!
//! # Design Decisions
//! - Only GETs flow through here, so every request is idempotent
//! - Retryable: transport errors, attempt timeouts, 408/429/500/502/503/504
//! - Attempts are strictly sequential; the backoff wait is cancellable

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::{FailureCause, TimeoutScope};
use crate::observability::metrics;
use crate::resilience::backoff::Backoff;
use crate::resilience::timeouts::CallDeadline;
use crate::transport::TransportResponse;

/// Result of one transport attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(TransportResponse),
    TransientFailure(FailureCause),
    PermanentFailure(FailureCause),
    /// The attempt hit its own limit while call budget remained.
    TimedOut { after: Duration },
}

impl AttemptOutcome {
    /// Whether the circuit breaker should count this outcome against the endpoint.
    pub fn is_endpoint_failure(&self) -> bool {
        match self {
            AttemptOutcome::Success(_) => false,
            AttemptOutcome::TransientFailure(_) | AttemptOutcome::TimedOut { .. } => true,
            AttemptOutcome::PermanentFailure(cause) => {
                matches!(cause, FailureCause::TimedOut { .. })
            }
        }
    }
}

/// Statuses worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

/// Turn a received response into an attempt outcome.
pub fn classify_response(response: TransportResponse) -> AttemptOutcome {
    let status = response.status;
    if status.is_success() {
        AttemptOutcome::Success(response)
    } else if is_retryable_status(status) {
        AttemptOutcome::TransientFailure(FailureCause::ServerFault {
            status: status.as_u16(),
        })
    } else {
        AttemptOutcome::PermanentFailure(FailureCause::RemoteRejected {
            status: status.as_u16(),
        })
    }
}

/// State carried between attempts of one call.
#[derive(Debug, Default)]
pub struct RetryContext {
    /// Zero-based number of the attempt that just failed.
    pub attempt: u32,
    /// Time since the call started.
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, Backoff::from_config(config))
    }

    /// Wait before the retry that follows `ctx.attempt`.
    pub fn next_delay(&self, ctx: &RetryContext) -> Duration {
        self.backoff.delay_with_jitter(ctx.attempt + 1)
    }

    /// Drive `attempt` until it succeeds, fails permanently, or retries run out.
    ///
    /// `attempt` receives the zero-based attempt number.
    pub async fn run<F, Fut>(
        &self,
        endpoint: &str,
        deadline: &CallDeadline,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<TransportResponse, FailureCause>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AttemptOutcome>,
    {
        let mut ctx = RetryContext::default();
        loop {
            let cause = match attempt(ctx.attempt).await {
                AttemptOutcome::Success(response) => return Ok(response),
                AttemptOutcome::PermanentFailure(cause) => return Err(cause),
                AttemptOutcome::TransientFailure(cause) => cause,
                AttemptOutcome::TimedOut { after } => FailureCause::TimedOut {
                    scope: TimeoutScope::Attempt,
                    after,
                },
            };
            ctx.elapsed = deadline.elapsed();

            if ctx.attempt >= self.max_retries {
                tracing::warn!(
                    endpoint = %endpoint,
                    attempts = ctx.attempt + 1,
                    error = %cause,
                    "Retries exhausted"
                );
                return Err(cause);
            }

            let delay = self.next_delay(&ctx);
            if !deadline.allows_wait(delay) {
                tracing::warn!(
                    endpoint = %endpoint,
                    attempts = ctx.attempt + 1,
                    elapsed_ms = ctx.elapsed.as_millis() as u64,
                    delay_ms = delay.as_millis() as u64,
                    error = %cause,
                    "Call budget too small for another retry"
                );
                return Err(FailureCause::TimedOut {
                    scope: TimeoutScope::Call,
                    after: ctx.elapsed,
                });
            }

            tracing::warn!(
                endpoint = %endpoint,
                attempt = ctx.attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %cause,
                "Retrying request"
            );
            metrics::record_retry(endpoint, cause.label());

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FailureCause::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            ctx.attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Backoff::default())
    }
}
