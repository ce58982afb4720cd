//! Tracing setup and span attributes for poll tasks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::{Result, TrackerError};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "gentrack=info";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs a global `tracing` subscriber filtered by `RUST_LOG`.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let builder = fmt().with_env_filter(env_filter()).with_target(true);
    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| TrackerError::Config(format!("failed to install tracing subscriber: {e}")))
}

/// Attributes attached to the span of one pipeline's poll task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSpanAttributes {
    /// Pipeline id.
    pub pipeline_id: String,
    /// Poll interval in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Service name.
    pub service: Option<String>,
}

impl PipelineSpanAttributes {
    /// Creates attributes for a pipeline.
    #[must_use]
    pub fn new(pipeline_id: impl Into<String>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            ..Default::default()
        }
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = Some(u64::try_from(interval.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the service name.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Converts to flat key/value attributes.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        attrs.insert("pipeline.id".to_string(), self.pipeline_id.clone());

        if let Some(v) = self.poll_interval_ms {
            attrs.insert("pipeline.poll_interval_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.service {
            attrs.insert("service.name".to_string(), v.clone());
        }

        attrs
    }

    /// Creates the `pipeline_poll` span.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "pipeline_poll",
            pipeline_id = %self.pipeline_id,
            poll_interval_ms = self.poll_interval_ms,
            service = self.service.as_deref(),
        )
    }
}
