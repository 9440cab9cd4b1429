//! Fetch subsystem.
//!
//! # Data Flow
//! ```text
//! caller: fetch::<T>(endpoint, path)
//!     → service.rs (span with call_id, registry lookup)
//!     → EndpointPipeline::execute (timeouts, retries, breaker, transport)
//!     → decode_body (empty ⇒ None, else serde_json into T)
//!     → Ok(Option<T>) or ErrorEnvelope
//! ```

pub mod service;

pub use service::{decode_body, FetchService};
