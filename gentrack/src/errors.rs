//! Error types for the pipeline tracker.
//!
//! Submission and fetch failures carry the message reported by the
//! generation service when one was available, otherwise a generic message.

use thiserror::Error;

/// Message used when a submission fails without a service-reported reason.
pub const SUBMISSION_FAILED: &str = "failed to start pipeline";

/// Message used when a status fetch fails without a service-reported reason.
pub const FETCH_FAILED: &str = "failed to fetch pipeline status";

/// Convenience result alias for tracker operations.
pub type Result<T, E = TrackerError> = std::result::Result<T, E>;

/// The main error type for tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Creating a pipeline on the generation service failed.
    ///
    /// Never retried; no tracked entry exists for the request.
    #[error("{0}")]
    Submission(String),

    /// A single status fetch failed.
    #[error("{0}")]
    Fetch(String),

    /// The tracker configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    /// Creates a submission error, falling back to the generic message.
    #[must_use]
    pub fn submission(message: Option<String>) -> Self {
        Self::Submission(non_empty_or(message, SUBMISSION_FAILED))
    }

    /// Creates a fetch error, falling back to the generic message.
    #[must_use]
    pub fn fetch(message: Option<String>) -> Self {
        Self::Fetch(non_empty_or(message, FETCH_FAILED))
    }

    /// Returns true if this error came from a status fetch.
    #[must_use]
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }

    /// Returns true if this error came from a submission.
    #[must_use]
    pub fn is_submission(&self) -> bool {
        matches!(self, Self::Submission(_))
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

fn non_empty_or(message: Option<String>, fallback: &str) -> String {
    message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
