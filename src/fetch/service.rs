//! Fetch-and-deserialize service.
//!
//! # Responsibilities
//! - Route each call to the pipeline of its endpoint identity
//! - Turn the final response body into the caller's type
//! - Convert every failure into an [`ErrorEnvelope`]
//!
//! # Design Decisions
//! - An empty body is "no content" (`Ok(None)`), not an error
//! - Deserialization runs once, after the pipeline; it is never retried
//! - Every call gets a `call_id` carried on its tracing span

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{ErrorEnvelope, FailureCause};
use crate::observability::metrics;
use crate::resilience::registry::EndpointRegistry;

const UNKNOWN_ENDPOINT_LABEL: &str = "unknown";

/// Handle used by callers to issue resilient GETs. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FetchService {
    registry: Arc<EndpointRegistry>,
}

impl FetchService {
    pub fn new(registry: Arc<EndpointRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    /// GET `path` on `endpoint` and deserialize the JSON body into `T`.
    ///
    /// Returns `Ok(None)` when the remote answered with an empty body.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
    ) -> Result<Option<T>, ErrorEnvelope> {
        self.fetch_with_cancel(endpoint, path, &CancellationToken::new())
            .await
    }

    /// Like [`FetchService::fetch`], aborting when `cancel` fires.
    pub async fn fetch_with_cancel<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, ErrorEnvelope> {
        let call_id = Uuid::new_v4();
        let span = tracing::info_span!("fetch", endpoint = %endpoint, path = %path, call_id = %call_id);
        self.observed(endpoint, path, cancel).instrument(span).await
    }

    async fn observed<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, ErrorEnvelope> {
        let started = Instant::now();
        let result = self.execute(endpoint, path, cancel).await;
        let elapsed = started.elapsed();

        let outcome = match &result {
            Ok(Some(_)) => "success",
            Ok(None) => "no_content",
            Err(envelope) => envelope.cause.label(),
        };
        metrics::record_fetch(self.metric_label(endpoint), outcome, elapsed);

        match &result {
            Ok(_) => tracing::debug!(
                outcome,
                duration_ms = elapsed.as_millis() as u64,
                "Fetch completed"
            ),
            Err(envelope) => tracing::warn!(
                category = %envelope.category,
                attempts = envelope.attempts,
                status = ?envelope.status(),
                duration_ms = elapsed.as_millis() as u64,
                error = %envelope.cause,
                "Fetch failed"
            ),
        }
        result
    }

    /// Endpoint label for metrics; unconfigured names share one label.
    fn metric_label<'a>(&self, endpoint: &'a str) -> &'a str {
        if self.registry.contains(endpoint) {
            endpoint
        } else {
            UNKNOWN_ENDPOINT_LABEL
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, ErrorEnvelope> {
        let pipeline = self
            .registry
            .pipeline(endpoint)
            .map_err(|cause| ErrorEnvelope::new(endpoint, cause, 0))?;

        let done = pipeline
            .execute(path, cancel)
            .await
            .map_err(|err| ErrorEnvelope::new(endpoint, err.cause, err.attempts))?;

        decode_body(&done.response.body)
            .map_err(|cause| ErrorEnvelope::new(endpoint, cause, done.attempts))
    }
}

/// Deserialize a response body; an empty body yields `None`.
/// Bytes that are not valid UTF-8 JSON fail to deserialize.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, FailureCause> {
    if body.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(FailureCause::DeserializationFailed)
}
