//! reqwest-backed transport.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use super::{decode_status_response, decode_submit_response, PipelineTransport};
use crate::config::TransportConfig;
use crate::core::{PipelineConfig, PipelineId, PipelineStatus};
use crate::errors::{Result, TrackerError};

/// Talks to the generation service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Builds a transport from its configuration.
    pub fn new(config: TransportConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| TrackerError::Config(format!("invalid header name '{key}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TrackerError::Config(format!("invalid value for header '{key}': {e}")))?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TrackerError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Returns the transport configuration.
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait]
impl PipelineTransport for HttpTransport {
    async fn submit(&self, config: &PipelineConfig) -> Result<PipelineId> {
        let url = self.config.submit_url();
        debug!(%url, "Submitting pipeline");

        let response = self
            .client
            .post(&url)
            .json(config)
            .send()
            .await
            .map_err(|e| TrackerError::submission(Some(e.to_string())))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TrackerError::submission(Some(e.to_string())))?;

        decode_submit_response(status, &body)
    }

    async fn fetch(&self, id: &PipelineId) -> Result<PipelineStatus> {
        let url = self.config.status_url(id.as_str());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TrackerError::fetch(Some(e.to_string())))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TrackerError::fetch(Some(e.to_string())))?;

        decode_status_response(status, &body)
    }
}
