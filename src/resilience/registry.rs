//! Endpoint registry.
//!
//! Maps endpoint identities to their pipelines. Each identity gets exactly
//! one pipeline (and so one circuit breaker) for the life of the registry,
//! built on first use and shared by every caller afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::{ClientConfig, EndpointConfig};
use crate::error::FailureCause;
use crate::resilience::circuit_breaker::BreakerSnapshot;
use crate::resilience::pipeline::EndpointPipeline;
use crate::transport::{HttpTransport, Transport, TransportError};

pub struct EndpointRegistry {
    configs: HashMap<String, EndpointConfig>,
    transport: Arc<dyn Transport>,
    pipelines: DashMap<String, Arc<EndpointPipeline>>,
}

impl EndpointRegistry {
    pub fn new(endpoints: Vec<EndpointConfig>, transport: Arc<dyn Transport>) -> Self {
        let configs = endpoints
            .into_iter()
            .map(|endpoint| (endpoint.name.clone(), endpoint))
            .collect();
        Self {
            configs,
            transport,
            pipelines: DashMap::new(),
        }
    }

    /// Registry over the configured endpoints, sharing one HTTP client.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&config.http)?;
        Ok(Self::new(config.endpoints.clone(), Arc::new(transport)))
    }

    /// The pipeline for `name`, created on first request.
    pub fn pipeline(&self, name: &str) -> Result<Arc<EndpointPipeline>, FailureCause> {
        if let Some(existing) = self.pipelines.get(name) {
            return Ok(existing.value().clone());
        }

        let config = self
            .configs
            .get(name)
            .ok_or_else(|| FailureCause::UnknownEndpoint(name.to_string()))?;

        let entry = self
            .pipelines
            .entry(name.to_string())
            .or_try_insert_with(|| {
                tracing::debug!(endpoint = %name, base_address = %config.base_address, "Building endpoint pipeline");
                EndpointPipeline::new(config, self.transport.clone())
                    .map(Arc::new)
                    .map_err(|source| FailureCause::InvalidBaseAddress {
                        endpoint: name.to_string(),
                        source,
                    })
            })?;
        Ok(entry.value().clone())
    }

    /// Build every configured pipeline up front.
    pub fn warm_up(&self) -> Result<(), FailureCause> {
        for name in self.configs.keys() {
            self.pipeline(name)?;
        }
        Ok(())
    }

    /// Configured endpoint names, sorted.
    pub fn endpoints(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.configs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.configs.contains_key(name)
    }

    /// Breaker state of every pipeline built so far.
    pub fn breaker_snapshots(&self) -> Vec<(String, BreakerSnapshot)> {
        let mut snapshots: Vec<_> = self
            .pipelines
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().breaker().snapshot()))
            .collect();
        snapshots.sort_by(|a, b| a.0.cmp(&b.0));
        snapshots
    }
}

impl std::fmt::Debug for EndpointRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointRegistry")
            .field("endpoints", &self.endpoints())
            .field("built", &self.pipelines.len())
            .finish()
    }
}
