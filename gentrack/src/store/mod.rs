//! In-memory store of tracked pipelines.
//!
//! Holds two keyed containers, config-by-id and status-by-id, owned by one
//! tracker. Entries are created on submission, replaced on every successful
//! fetch and removed only by explicit cleanup.

mod entry;

pub use entry::TrackedEntry;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{PipelineConfig, PipelineId, PipelineStatus};

#[derive(Debug, Clone)]
struct RecordedStatus {
    status: PipelineStatus,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreInner {
    configs: HashMap<PipelineId, Arc<PipelineConfig>>,
    statuses: HashMap<PipelineId, RecordedStatus>,
}

impl StoreInner {
    fn entry(&self, id: &PipelineId) -> Option<TrackedEntry> {
        let config = self.configs.get(id)?;
        let recorded = self.statuses.get(id)?;
        Some(TrackedEntry {
            config: config.clone(),
            status: recorded.status.clone(),
            updated_at: recorded.updated_at,
        })
    }
}

/// Thread-safe store of tracked pipelines.
#[derive(Debug, Default)]
pub struct StatusStore {
    inner: RwLock<StoreInner>,
}

impl StatusStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly submitted pipeline and returns its initial snapshot.
    ///
    /// Re-registering an id replaces the previous entry.
    pub fn register(&self, id: PipelineId, config: Arc<PipelineConfig>) -> PipelineStatus {
        let status = PipelineStatus::initial(id.clone(), config.clone());
        let mut inner = self.inner.write();
        inner.configs.insert(id.clone(), config);
        inner.statuses.insert(
            id,
            RecordedStatus {
                status: status.clone(),
                updated_at: Utc::now(),
            },
        );
        status
    }

    /// Records a fetched snapshot for a tracked pipeline.
    ///
    /// The stored config is reattached and results omitted by the new
    /// snapshot are carried forward. Returns the snapshot as stored, or
    /// `None` if the id is not tracked (nothing is recorded).
    pub fn record(&self, mut status: PipelineStatus) -> Option<PipelineStatus> {
        let mut inner = self.inner.write();
        let config = inner.configs.get(&status.id)?.clone();

        if let Some(previous) = inner.statuses.get(&status.id) {
            status.retain_results_from(&previous.status);
        }
        status.config = Some(config);

        inner.statuses.insert(
            status.id.clone(),
            RecordedStatus {
                status: status.clone(),
                updated_at: Utc::now(),
            },
        );
        Some(status)
    }

    /// Returns the config submitted for a pipeline.
    #[must_use]
    pub fn config(&self, id: &PipelineId) -> Option<Arc<PipelineConfig>> {
        self.inner.read().configs.get(id).cloned()
    }

    /// Returns the last recorded snapshot of a pipeline.
    #[must_use]
    pub fn get(&self, id: &PipelineId) -> Option<PipelineStatus> {
        self.inner.read().statuses.get(id).map(|r| r.status.clone())
    }

    /// Returns the tracked entry of a pipeline.
    #[must_use]
    pub fn entry(&self, id: &PipelineId) -> Option<TrackedEntry> {
        self.inner.read().entry(id)
    }

    /// Returns every tracked entry, regardless of state, ordered by id.
    #[must_use]
    pub fn entries(&self) -> Vec<TrackedEntry> {
        let inner = self.inner.read();
        let mut ids: Vec<&PipelineId> = inner.statuses.keys().collect();
        ids.sort();
        ids.into_iter().filter_map(|id| inner.entry(id)).collect()
    }

    /// Removes every entry in a terminal state and returns their ids.
    pub fn clear_inactive(&self) -> Vec<PipelineId> {
        let mut inner = self.inner.write();
        let terminal: Vec<PipelineId> = inner
            .statuses
            .iter()
            .filter(|(_, recorded)| recorded.status.is_terminal())
            .map(|(id, _)| id.clone())
            .collect();

        for id in &terminal {
            inner.statuses.remove(id);
            inner.configs.remove(id);
        }
        terminal
    }

    /// Removes one entry regardless of its state.
    pub fn remove(&self, id: &PipelineId) -> Option<TrackedEntry> {
        let mut inner = self.inner.write();
        let entry = inner.entry(id);
        inner.statuses.remove(id);
        inner.configs.remove(id);
        entry
    }

    /// Returns true if the pipeline is tracked.
    #[must_use]
    pub fn contains(&self, id: &PipelineId) -> bool {
        self.inner.read().statuses.contains_key(id)
    }

    /// Returns the number of tracked pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().statuses.len()
    }

    /// Returns true if no pipelines are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().statuses.is_empty()
    }
}
