//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build transport → Build registry → FetchService
//!
//! Signals (signals.rs):
//!     SIGINT → Cancel in-flight fetches
//! ```

pub mod signals;
pub mod startup;

pub use signals::cancel_on_ctrl_c;
pub use startup::{build_service, resolve_config, StartupError};
