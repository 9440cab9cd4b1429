//! HTTP transport backed by a pooled `reqwest` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;

use crate::config::HttpClientConfig;
use crate::transport::{OutboundRequest, Transport, TransportError, TransportResponse};

/// Shared HTTP client used by every endpoint pipeline.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build the client from configuration.
    pub fn new(config: &HttpClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .build()?;
        Ok(Self { client })
    }

}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        tracing::debug!(url = %request.url, "Sending GET");

        let response = self
            .client
            .get(request.url.clone())
            .header(ACCEPT, request.accept.as_str())
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        Ok(TransportResponse::new(status, body.to_vec()))
    }
}
