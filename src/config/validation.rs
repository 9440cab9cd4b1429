//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check endpoint identities are unique and base addresses parse
//! - Validate value ranges (thresholds > 0, timeouts > 0, jitter in 0..=1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::{ClientConfig, EndpointConfig};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no endpoints configured")]
    NoEndpoints,

    #[error("endpoint name must not be empty")]
    EmptyEndpointName,

    #[error("endpoint '{0}' is defined more than once")]
    DuplicateEndpoint(String),

    #[error("endpoint '{name}' has invalid base address '{address}': {reason}")]
    InvalidBaseAddress {
        name: String,
        address: String,
        reason: String,
    },

    #[error("endpoint '{0}' has an empty Accept header value")]
    EmptyAccept(String),

    #[error("endpoint '{0}': failure_threshold must be at least 1")]
    ZeroFailureThreshold(String),

    #[error("endpoint '{name}': {field} must be greater than zero")]
    ZeroTimeout { name: String, field: &'static str },

    #[error("endpoint '{0}': attempt timeout exceeds the whole-call timeout")]
    AttemptExceedsCall(String),

    #[error("endpoint '{0}': jitter_ratio must be within 0.0..=1.0")]
    JitterOutOfRange(String),

    #[error("endpoint '{0}': max_delay_ms is below base_delay_ms")]
    MaxDelayBelowBase(String),
}

/// Validate the whole configuration, collecting every error.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.endpoints.is_empty() {
        errors.push(ValidationError::NoEndpoints);
    }

    let mut seen = HashSet::new();
    for endpoint in &config.endpoints {
        if !seen.insert(endpoint.name.as_str()) {
            errors.push(ValidationError::DuplicateEndpoint(endpoint.name.clone()));
        }
        validate_endpoint(endpoint, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_endpoint(endpoint: &EndpointConfig, errors: &mut Vec<ValidationError>) {
    let name = &endpoint.name;
    if name.trim().is_empty() {
        errors.push(ValidationError::EmptyEndpointName);
    }

    match Url::parse(&endpoint.base_address) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => {
            errors.push(ValidationError::InvalidBaseAddress {
                name: name.clone(),
                address: endpoint.base_address.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidBaseAddress {
            name: name.clone(),
            address: endpoint.base_address.clone(),
            reason: e.to_string(),
        }),
    }

    if endpoint.accept.trim().is_empty() {
        errors.push(ValidationError::EmptyAccept(name.clone()));
    }

    if endpoint.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold(name.clone()));
    }

    let timeouts = &endpoint.timeouts;
    if timeouts.attempt_ms == 0 {
        errors.push(ValidationError::ZeroTimeout {
            name: name.clone(),
            field: "timeouts.attempt_ms",
        });
    }
    if timeouts.call_ms == 0 {
        errors.push(ValidationError::ZeroTimeout {
            name: name.clone(),
            field: "timeouts.call_ms",
        });
    }
    if timeouts.attempt_ms > timeouts.call_ms {
        errors.push(ValidationError::AttemptExceedsCall(name.clone()));
    }

    let retry = &endpoint.retry;
    if !(0.0..=1.0).contains(&retry.jitter_ratio) {
        errors.push(ValidationError::JitterOutOfRange(name.clone()));
    }
    if matches!(retry.max_delay_ms, Some(max) if max < retry.base_delay_ms) {
        errors.push(ValidationError::MaxDelayBelowBase(name.clone()));
    }
}
