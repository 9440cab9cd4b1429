//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Build the shared HTTP transport and the endpoint registry
//! - Hand back a ready [`FetchService`]
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Every pipeline is built before the first call

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::validation::validate_config;
use crate::config::{load_config, ClientConfig, ConfigError};
use crate::error::FailureCause;
use crate::fetch::FetchService;
use crate::resilience::registry::EndpointRegistry;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to build endpoint pipelines: {0}")]
    Pipeline(#[from] FailureCause),
}

/// Configuration from `path`, or the defaults when no path is given.
pub fn resolve_config(path: Option<&Path>) -> Result<ClientConfig, StartupError> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => {
            let config = ClientConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Build the registry and fetch service for a validated configuration.
pub fn build_service(config: &ClientConfig) -> Result<FetchService, StartupError> {
    let registry = EndpointRegistry::from_config(config)?;
    registry.warm_up()?;

    for name in registry.endpoints() {
        if let Some(endpoint) = config.endpoint(name) {
            tracing::info!(
                endpoint = %name,
                base_address = %endpoint.base_address,
                max_retries = endpoint.retry.max_retries,
                failure_threshold = endpoint.circuit_breaker.failure_threshold,
                call_timeout_ms = endpoint.timeouts.call_ms,
                "Endpoint registered"
            );
        }
    }

    Ok(FetchService::new(Arc::new(registry)))
}
