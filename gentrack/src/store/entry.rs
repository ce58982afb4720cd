//! Tracked entry type.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::core::{PipelineConfig, PipelineId, PipelineState, PipelineStatus};

/// A pipeline's submitted config paired with its most recent snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEntry {
    /// The config supplied at submission.
    pub config: Arc<PipelineConfig>,
    /// The latest recorded snapshot, with `config` attached.
    pub status: PipelineStatus,
    /// When the snapshot was recorded.
    pub updated_at: DateTime<Utc>,
}

impl TrackedEntry {
    /// Returns the pipeline id.
    #[must_use]
    pub fn id(&self) -> &PipelineId {
        &self.status.id
    }

    /// Returns the pipeline state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.status.status
    }

    /// Returns true if the pipeline is in an absorbing state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
