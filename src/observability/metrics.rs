//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fetch_requests_total` (counter): completed fetches by endpoint, outcome
//! - `fetch_request_duration_seconds` (histogram): whole-call latency
//! - `fetch_retries_total` (counter): retries by endpoint and failure reason
//! - `circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `circuit_breaker_rejections_total` (counter): calls refused while open
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::BreakerState;

/// Install the Prometheus exporter with an HTTP scrape listener.
/// Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_fetch(endpoint: &str, outcome: &'static str, elapsed: Duration) {
    counter!(
        "fetch_requests_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("fetch_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_retry(endpoint: &str, reason: &'static str) {
    counter!(
        "fetch_retries_total",
        "endpoint" => endpoint.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_breaker_state(endpoint: &str, state: BreakerState) {
    let value = match state {
        BreakerState::Closed => 0.0,
        BreakerState::Open => 1.0,
        BreakerState::HalfOpen => 2.0,
    };
    gauge!("circuit_breaker_state", "endpoint" => endpoint.to_string()).set(value);
}

pub fn record_breaker_rejection(endpoint: &str) {
    counter!("circuit_breaker_rejections_total", "endpoint" => endpoint.to_string()).increment(1);
}
