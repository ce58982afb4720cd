//! Snapshot builders and test setup.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Once;

use crate::core::{PipelineId, PipelineState, PipelineStatus, StageProgress, StageState};

/// Creates a bare snapshot as the service would return it.
#[must_use]
pub fn snapshot(id: &PipelineId, status: PipelineState, progress: u32) -> PipelineStatus {
    SnapshotBuilder::new(id.clone()).status(status).progress(progress).build()
}

/// Builder for service-side snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    id: PipelineId,
    status: PipelineState,
    progress: u32,
    stages: BTreeMap<String, StageProgress>,
    results: Map<String, Value>,
    error: Option<String>,
}

impl SnapshotBuilder {
    /// Starts an `initializing` snapshot at 0%.
    #[must_use]
    pub fn new(id: PipelineId) -> Self {
        Self {
            id,
            status: PipelineState::Initializing,
            progress: 0,
            stages: BTreeMap::new(),
            results: Map::new(),
            error: None,
        }
    }

    /// Sets the overall state.
    #[must_use]
    pub fn status(mut self, status: PipelineState) -> Self {
        self.status = status;
        self
    }

    /// Sets the overall progress.
    #[must_use]
    pub fn progress(mut self, progress: u32) -> Self {
        self.progress = progress;
        self
    }

    /// Sets a stage record.
    #[must_use]
    pub fn stage(mut self, name: &str, status: StageState, progress: u32) -> Self {
        self.stages
            .insert(name.to_string(), StageProgress::new(status, progress));
        self
    }

    /// Adds a result artifact.
    #[must_use]
    pub fn result(mut self, stage: &str, value: Value) -> Self {
        self.results.insert(stage.to_string(), value);
        self
    }

    /// Marks the snapshot failed with a message.
    #[must_use]
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.status = PipelineState::Failed;
        self.error = Some(error.into());
        self
    }

    /// Builds the snapshot.
    #[must_use]
    pub fn build(self) -> PipelineStatus {
        PipelineStatus {
            id: self.id,
            status: self.status,
            progress: self.progress,
            stages: self.stages,
            results: self.results,
            error: self.error,
            config: None,
        }
    }
}

static TRACING: Once = Once::new();

/// Installs a test-writer tracing subscriber once per process.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gentrack=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}
