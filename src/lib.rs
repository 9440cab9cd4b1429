//! Resilient outbound HTTP fetch library.
//!
//! Every GET to a named remote dependency runs through a per-endpoint policy
//! pipeline (whole-call timeout, retries with exponential backoff, circuit
//! breaker) and comes back either as a deserialized value or as a single
//! [`ErrorEnvelope`].

// Core subsystems
pub mod config;
pub mod error;
pub mod fetch;
pub mod transport;

// Policies
pub mod resilience;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ClientConfig;
pub use error::{ErrorCategory, ErrorEnvelope, FailureCause};
pub use fetch::FetchService;
pub use resilience::EndpointRegistry;
