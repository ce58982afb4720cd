//! Transport layer to the external generation service.
//!
//! [`PipelineTransport`] is the seam between the tracker and the service:
//! one call to create a pipeline and one to read its status. Every
//! implementation reports failures through [`TrackerError`], so error
//! message extraction happens here once instead of at each call site.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpTransport;

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::{PipelineConfig, PipelineId, PipelineStatus};
use crate::errors::{Result, TrackerError};

/// Client side of the generation service API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineTransport: Send + Sync {
    /// Submits a new pipeline and returns the id assigned by the service.
    ///
    /// Fails with [`TrackerError::Submission`].
    async fn submit(&self, config: &PipelineConfig) -> Result<PipelineId>;

    /// Fetches the current status snapshot of a pipeline.
    ///
    /// Fails with [`TrackerError::Fetch`].
    async fn fetch(&self, id: &PipelineId) -> Result<PipelineStatus>;
}

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable reason.
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// Parses an error body, tolerating anything that is not the expected JSON.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Returns the reported message, if it is non-empty.
    #[must_use]
    pub fn message(self) -> Option<String> {
        self.error.filter(|m| !m.trim().is_empty())
    }
}

/// Successful response to a submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    pipeline_id: PipelineId,
}

fn is_success(status_code: u16) -> bool {
    (200..300).contains(&status_code)
}

/// Interprets the response to a submission request.
pub fn decode_submit_response(status_code: u16, body: &str) -> Result<PipelineId> {
    if !is_success(status_code) {
        return Err(TrackerError::submission(ApiErrorBody::parse(body).message()));
    }
    serde_json::from_str::<SubmitResponse>(body)
        .map(|r| r.pipeline_id)
        .map_err(|e| TrackerError::Submission(format!("invalid submission response: {e}")))
}

/// Interprets the response to a status request.
pub fn decode_status_response(status_code: u16, body: &str) -> Result<PipelineStatus> {
    if !is_success(status_code) {
        return Err(TrackerError::fetch(ApiErrorBody::parse(body).message()));
    }
    serde_json::from_str::<PipelineStatus>(body)
        .map_err(|e| TrackerError::Fetch(format!("invalid status response: {e}")))
}
