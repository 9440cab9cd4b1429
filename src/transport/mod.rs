//! Raw transport subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline attempt
//!     → OutboundRequest (resolved URL + Accept header)
//!     → Transport::get (one HTTP GET, body read to bytes)
//!     → TransportResponse or TransportError
//! ```
//!
//! # Design Decisions
//! - The body is read inside the attempt, so body read failures are retryable
//! - No status interpretation here; classification belongs to the retry layer
//! - Trait object seam so the pipeline can run against a scripted transport

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

pub mod http;

#[cfg(test)]
pub(crate) mod scripted;

pub use http::HttpTransport;

/// One GET request as handed to the transport.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: Url,
    pub accept: String,
}

/// A response whose body has been fully read, bytes untouched.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Errors raised below the HTTP status level.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport timeout: {0}")]
    Timeout(String),

    #[error("reading response body failed: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = error_chain(&err);
        if err.is_timeout() {
            TransportError::Timeout(message)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(message)
        } else {
            TransportError::Request(message)
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// Issues a single GET attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError>;
}
