//! Per-endpoint policy pipeline.
//!
//! # Composition (outer to inner)
//! ```text
//! CallDeadline::guard_call   (whole call budget)
//!     → RetryPolicy::run     (sequential attempts, backoff)
//!         → CircuitBreaker   (permit per attempt, fail fast when open)
//!             → guard_attempt (per-attempt limit)
//!                 → Transport::get
//! ```
//!
//! The breaker is consulted on every attempt, so a breaker that trips in the
//! middle of a call short-circuits that call's remaining retries.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::EndpointConfig;
use crate::error::{FailureCause, TimeoutScope};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::retries::{classify_response, AttemptOutcome, RetryPolicy};
use crate::resilience::timeouts::{CallDeadline, Elapsed, TimeoutPolicy};
use crate::transport::{OutboundRequest, Transport, TransportResponse};

/// A successful call and how many transport attempts it took.
#[derive(Debug)]
pub struct PipelineResponse {
    pub response: TransportResponse,
    pub attempts: u32,
}

/// A failed call and how many transport attempts were made.
#[derive(Debug, Error)]
#[error("{cause} (after {attempts} attempts)")]
pub struct PipelineError {
    pub cause: FailureCause,
    pub attempts: u32,
}

/// Retry, breaker and timeout policies bound to one endpoint identity.
pub struct EndpointPipeline {
    name: String,
    base_url: Url,
    accept: String,
    retry: RetryPolicy,
    timeouts: TimeoutPolicy,
    breaker: CircuitBreaker,
    transport: Arc<dyn Transport>,
}

impl EndpointPipeline {
    pub fn new(config: &EndpointConfig, transport: Arc<dyn Transport>) -> Result<Self, url::ParseError> {
        Ok(Self {
            name: config.name.clone(),
            base_url: directory_url(&config.base_address)?,
            accept: config.accept.clone(),
            retry: RetryPolicy::from_config(&config.retry),
            timeouts: TimeoutPolicy::from_config(&config.timeouts),
            breaker: CircuitBreaker::from_config(config.name.clone(), &config.circuit_breaker),
            transport,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Resolve `path` against the base address. Absolute URLs pass through.
    pub fn resolve(&self, path: &str) -> Result<Url, FailureCause> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| FailureCause::InvalidPath {
                path: path.to_string(),
                source,
            })
    }

    /// GET `path` through the full policy stack.
    pub async fn execute(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<PipelineResponse, PipelineError> {
        let url = self
            .resolve(path)
            .map_err(|cause| PipelineError { cause, attempts: 0 })?;
        let request = OutboundRequest {
            url,
            accept: self.accept.clone(),
        };
        self.execute_request(&request, cancel).await
    }

    pub async fn execute_request(
        &self,
        request: &OutboundRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineResponse, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError {
                cause: FailureCause::Cancelled,
                attempts: 0,
            });
        }

        let attempts = AtomicU32::new(0);
        let deadline = CallDeadline::start(self.timeouts.call);

        let (deadline_ref, attempts_ref) = (&deadline, &attempts);
        let retried = self.retry.run(&self.name, &deadline, cancel, move |n| {
            self.attempt(request, deadline_ref, cancel, attempts_ref, n)
        });

        let result = match deadline.guard_call(retried).await {
            Ok(result) => result,
            Err(Elapsed { scope, after }) => Err(FailureCause::TimedOut { scope, after }),
        };

        let attempts = attempts.load(Ordering::SeqCst);
        match result {
            Ok(response) => Ok(PipelineResponse { response, attempts }),
            Err(cause) => Err(PipelineError { cause, attempts }),
        }
    }

    async fn attempt(
        &self,
        request: &OutboundRequest,
        deadline: &CallDeadline,
        cancel: &CancellationToken,
        attempts: &AtomicU32,
        n: u32,
    ) -> AttemptOutcome {
        let permit = match self.breaker.try_acquire() {
            Ok(permit) => permit,
            Err(rejection) => {
                tracing::warn!(
                    endpoint = %self.name,
                    attempt = n,
                    retry_after_ms = rejection.retry_after.as_millis() as u64,
                    "Call rejected by open circuit breaker"
                );
                return AttemptOutcome::PermanentFailure(FailureCause::BreakerOpen {
                    endpoint: self.name.clone(),
                    retry_after: rejection.retry_after,
                });
            }
        };

        attempts.fetch_add(1, Ordering::SeqCst);
        let guarded = deadline.guard_attempt(self.timeouts.attempt, self.transport.get(request));

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                permit.abandon();
                return AttemptOutcome::PermanentFailure(FailureCause::Cancelled);
            }
            result = guarded => result,
        };

        let outcome = match result {
            Ok(Ok(response)) => classify_response(response),
            Ok(Err(err)) => AttemptOutcome::TransientFailure(FailureCause::Transport(err)),
            Err(Elapsed {
                scope: TimeoutScope::Attempt,
                after,
            }) => AttemptOutcome::TimedOut { after },
            Err(Elapsed { scope, after }) => {
                AttemptOutcome::PermanentFailure(FailureCause::TimedOut { scope, after })
            }
        };

        if outcome.is_endpoint_failure() {
            permit.failure();
        } else {
            permit.success();
        }

        tracing::debug!(endpoint = %self.name, attempt = n, url = %request.url, "Attempt finished");
        outcome
    }
}

impl std::fmt::Debug for EndpointPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointPipeline")
            .field("name", &self.name)
            .field("base_url", &self.base_url.as_str())
            .field("retry", &self.retry)
            .field("timeouts", &self.timeouts)
            .field("breaker", &self.breaker.state())
            .finish()
    }
}

/// Parse a base address so that relative joins append to its path.
fn directory_url(address: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(address)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
