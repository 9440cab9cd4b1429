//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! fetch(endpoint, path):
//!     → registry.rs (endpoint identity → pipeline, one per identity)
//!     → pipeline.rs (compose the policies below)
//!         → timeouts.rs (whole-call budget, per-attempt limit)
//!         → retries.rs (classify, retry transient failures with backoff.rs)
//!         → circuit_breaker.rs (permit per attempt, trip on repeated failure)
//!         → transport
//! ```
//!
//! # Design Decisions
//! - Every outbound call has a deadline
//! - Only GETs pass through, so every attempt is safe to repeat
//! - Breaker state is scoped to the endpoint identity, never global
//! - Policies are plain values built from config, composed per call

pub mod backoff;
pub mod circuit_breaker;
pub mod pipeline;
pub mod registry;
pub mod retries;
pub mod timeouts;

pub use backoff::Backoff;
pub use circuit_breaker::{BreakerSnapshot, BreakerState, CircuitBreaker};
pub use pipeline::{EndpointPipeline, PipelineError, PipelineResponse};
pub use registry::EndpointRegistry;
pub use retries::RetryPolicy;
pub use timeouts::TimeoutPolicy;
