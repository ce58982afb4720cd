//! Tracker and transport configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::errors::{Result, TrackerError};

/// Configuration for a [`PipelineTracker`](crate::tracker::PipelineTracker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Delay between two status fetches of the same pipeline, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// HTTP transport settings.
    #[serde(default)]
    pub transport: TransportConfig,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            transport: TransportConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the transport configuration.
    #[must_use]
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Gets the poll interval as Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks the configuration for values the tracker cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(TrackerError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        self.transport.validate()
    }
}

/// Configuration for the HTTP transport to the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Base URL of the generation service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path that accepts new pipeline submissions.
    #[serde(default = "default_pipeline_path")]
    pub submit_path: String,
    /// Path prefix for status lookups; the pipeline id is appended.
    #[serde(default = "default_pipeline_path")]
    pub status_path: String,
    /// Optional per-request timeout in seconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Additional headers to include (e.g. authorization).
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_pipeline_path() -> String {
    "/api/generation/pipeline".to_string()
}

fn default_user_agent() -> String {
    concat!("gentrack/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            submit_path: default_pipeline_path(),
            status_path: default_pipeline_path(),
            timeout_seconds: None,
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

impl TransportConfig {
    /// Creates a transport configuration pointing at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Gets the timeout as Duration, if one is set and representable.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
    }

    /// URL that new pipelines are posted to.
    #[must_use]
    pub fn submit_url(&self) -> String {
        join_url(&self.base_url, &self.submit_path)
    }

    /// URL of the status resource for one pipeline.
    #[must_use]
    pub fn status_url(&self, pipeline_id: &str) -> String {
        format!("{}/{pipeline_id}", join_url(&self.base_url, &self.status_path))
    }

    /// Checks the base URL scheme and the timeout range.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(TrackerError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if let Some(timeout) = self.timeout_seconds {
            if timeout <= 0.0 || Duration::try_from_secs_f64(timeout).is_err() {
                return Err(TrackerError::Config(format!(
                    "timeout_seconds must be a positive number of seconds, got {timeout}"
                )));
            }
        }
        Ok(())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/').trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(2000));
        assert!(config.transport.timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_urls() {
        let transport = TransportConfig::new("https://forge.example.com/");
        assert_eq!(
            transport.submit_url(),
            "https://forge.example.com/api/generation/pipeline"
        );
        assert_eq!(
            transport.status_url("abc"),
            "https://forge.example.com/api/generation/pipeline/abc"
        );
    }

    #[test]
    fn test_from_json_partial() {
        let config = TrackerConfig::from_json_str(
            r#"{"poll_interval_ms": 500, "transport": {"base_url": "http://gen:8080"}}"#,
        )
        .unwrap();

        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.transport.base_url, "http://gen:8080");
        assert_eq!(config.transport.submit_path, "/api/generation/pipeline");
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let err = TrackerConfig::from_json_str(r#"{"poll_interval_ms": 0}"#).unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_url_and_timeout() {
        let config = TrackerConfig::new().with_transport(TransportConfig::new("ftp://x"));
        assert!(config.validate().is_err());

        let config =
            TrackerConfig::new().with_transport(TransportConfig::default().with_timeout(-1.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unrepresentable_timeout() {
        let err =
            TrackerConfig::from_json_str(r#"{"transport": {"timeout_seconds": 1e30}}"#).unwrap_err();
        assert!(matches!(err, TrackerError::Config(_)));

        let transport = TransportConfig::default().with_timeout(1e30);
        assert!(transport.validate().is_err());
        assert!(transport.timeout().is_none());
        assert!(TransportConfig::default().with_timeout(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"transport": {{"headers": {{"Authorization": "Bearer t"}}, "timeout_seconds": 15}}}}"#
        )
        .unwrap();

        let config = TrackerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(
            config.transport.headers.get("Authorization"),
            Some(&"Bearer t".to_string())
        );
        assert_eq!(config.transport.timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_from_missing_file_is_io_error() {
        let err = TrackerConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, TrackerError::Io(_)));
    }
}
