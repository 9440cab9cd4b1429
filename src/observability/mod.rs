//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline and fetch service produce:
//!     → logging.rs (structured log events, one span per fetch)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Retries and breaker-open are warnings; half-open and reset are info
//! - Every fetch carries a generated call id for correlation
//! - Metrics are cheap when no exporter is installed

pub mod logging;
pub mod metrics;
