//! Failure taxonomy and the uniform error envelope returned to callers.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::transport::TransportError;

/// Which timeout boundary was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutScope {
    /// A single transport attempt exceeded its limit.
    Attempt,
    /// The whole call, retries and backoff included, ran out of budget.
    Call,
}

impl fmt::Display for TimeoutScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutScope::Attempt => f.write_str("attempt"),
            TimeoutScope::Call => f.write_str("call"),
        }
    }
}

/// Why a call (or one attempt of it) failed.
#[derive(Debug, Error)]
pub enum FailureCause {
    /// DNS, connect, reset or body read failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Terminal non-success status.
    #[error("remote rejected the request with status {status}")]
    RemoteRejected { status: u16 },

    /// Retryable status (5xx, 429, 408).
    #[error("remote fault with status {status}")]
    ServerFault { status: u16 },

    #[error("{scope} timed out after {after:?}")]
    TimedOut { scope: TimeoutScope, after: Duration },

    /// Rejected by the circuit breaker without a transport attempt.
    #[error("circuit breaker open for endpoint '{endpoint}'")]
    BreakerOpen {
        endpoint: String,
        retry_after: Duration,
    },

    #[error("failed to deserialize response body: {0}")]
    DeserializationFailed(#[source] serde_json::Error),

    #[error("call cancelled")]
    Cancelled,

    #[error("unknown endpoint '{0}'")]
    UnknownEndpoint(String),

    #[error("endpoint '{endpoint}' has an invalid base address: {source}")]
    InvalidBaseAddress {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("cannot resolve path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },
}

impl FailureCause {
    /// Envelope category this cause surfaces as.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FailureCause::Transport(_)
            | FailureCause::ServerFault { .. }
            | FailureCause::TimedOut { .. }
            | FailureCause::BreakerOpen { .. } => ErrorCategory::Unavailable,
            FailureCause::RemoteRejected { .. } => ErrorCategory::RemoteRejected,
            FailureCause::DeserializationFailed(_) => ErrorCategory::DeserializationFailed,
            FailureCause::Cancelled => ErrorCategory::Cancelled,
            FailureCause::UnknownEndpoint(_)
            | FailureCause::InvalidBaseAddress { .. }
            | FailureCause::InvalidPath { .. } => ErrorCategory::Misconfigured,
        }
    }

    /// Remote status code, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            FailureCause::RemoteRejected { status } | FailureCause::ServerFault { status } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            FailureCause::Transport(_) => "transport",
            FailureCause::RemoteRejected { .. } => "remote_rejected",
            FailureCause::ServerFault { .. } => "server_fault",
            FailureCause::TimedOut { .. } => "timed_out",
            FailureCause::BreakerOpen { .. } => "breaker_open",
            FailureCause::DeserializationFailed(_) => "deserialization_failed",
            FailureCause::Cancelled => "cancelled",
            FailureCause::UnknownEndpoint(_) => "unknown_endpoint",
            FailureCause::InvalidBaseAddress { .. } => "invalid_base_address",
            FailureCause::InvalidPath { .. } => "invalid_path",
        }
    }
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport, timeout, breaker or exhausted-retry failure.
    Unavailable,
    /// The remote answered with a terminal non-success status.
    RemoteRejected,
    DeserializationFailed,
    Cancelled,
    /// Unknown endpoint identity or unresolvable path.
    Misconfigured,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Unavailable => "Unavailable",
            ErrorCategory::RemoteRejected => "RemoteRejected",
            ErrorCategory::DeserializationFailed => "DeserializationFailed",
            ErrorCategory::Cancelled => "Cancelled",
            ErrorCategory::Misconfigured => "Misconfigured",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error type that crosses the fetch boundary.
#[derive(Debug, Error)]
#[error("{category} calling '{endpoint}': {message}")]
pub struct ErrorEnvelope {
    pub category: ErrorCategory,
    pub message: String,
    pub endpoint: String,
    /// Transport attempts actually made for this call.
    pub attempts: u32,
    #[source]
    pub cause: FailureCause,
}

impl ErrorEnvelope {
    pub fn new(endpoint: impl Into<String>, cause: FailureCause, attempts: u32) -> Self {
        let category = cause.category();
        let message = match category {
            ErrorCategory::Unavailable => format!("remote dependency unavailable: {cause}"),
            _ => cause.to_string(),
        };
        Self {
            category,
            message,
            endpoint: endpoint.into(),
            attempts,
            cause,
        }
    }

    /// Remote status code, if a response was received.
    pub fn status(&self) -> Option<u16> {
        self.cause.status()
    }

    /// Status the surrounding HTTP layer should answer its own caller with.
    pub fn status_code(&self) -> StatusCode {
        match self.category {
            ErrorCategory::Unavailable | ErrorCategory::Cancelled => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorCategory::RemoteRejected => StatusCode::BAD_GATEWAY,
            ErrorCategory::DeserializationFailed | ErrorCategory::Misconfigured => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON body describing the failure, safe to hand back to callers.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "category": self.category.as_str(),
            "message": self.message,
            "endpoint": self.endpoint,
            "status": self.status(),
            "attempts": self.attempts,
        })
    }
}
