//! The pipeline tracker.
//!
//! [`PipelineTracker`] owns the status store, the event emitter and one poll
//! task per active pipeline. Dropping the tracker cancels every poll task.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::TrackerConfig;
use crate::core::{PipelineConfig, PipelineId, PipelineStatus};
use crate::errors::Result;
use crate::events::{EventEmitter, StartedEvent, TrackerEvent};
use crate::poller::{self, PollContext, PollExit, PollHandle};
use crate::store::{StatusStore, TrackedEntry};
use crate::transport::PipelineTransport;

/// Submits generation pipelines and follows them until they finish.
pub struct PipelineTracker {
    config: TrackerConfig,
    store: Arc<StatusStore>,
    emitter: Arc<EventEmitter>,
    ctx: PollContext,
    pollers: DashMap<PipelineId, PollHandle>,
}

impl PipelineTracker {
    /// Creates a tracker over any transport.
    pub fn new(transport: Arc<dyn PipelineTransport>, config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(StatusStore::new());
        let emitter = Arc::new(EventEmitter::new());
        let ctx = PollContext::new(
            transport,
            store.clone(),
            emitter.clone(),
            config.poll_interval(),
        );

        Ok(Self {
            config,
            store,
            emitter,
            ctx,
            pollers: DashMap::new(),
        })
    }

    /// Creates a tracker that talks to the service over HTTP.
    #[cfg(feature = "http")]
    pub fn with_http(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let transport = crate::transport::HttpTransport::new(config.transport.clone())?;
        Self::new(Arc::new(transport), config)
    }

    /// Returns the tracker configuration.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Returns the event emitter to subscribe on.
    #[must_use]
    pub fn events(&self) -> &EventEmitter {
        &self.emitter
    }

    /// Submits a pipeline and starts polling it.
    ///
    /// On failure nothing is tracked and no event is emitted.
    pub async fn start_pipeline(&self, config: PipelineConfig) -> Result<PipelineId> {
        let id = self.ctx.transport().submit(&config).await.map_err(|err| {
            debug!(error = %err, "Pipeline submission failed");
            err
        })?;
        let config = Arc::new(config);

        self.store.register(id.clone(), config);
        info!(pipeline_id = %id, "Pipeline started");
        self.emitter.emit(&TrackerEvent::Started(StartedEvent {
            pipeline_id: id.clone(),
        }));

        self.prune_finished();
        let handle = poller::spawn(self.ctx.clone(), id.clone());
        if let Some(previous) = self.pollers.insert(id.clone(), handle) {
            previous.cancel("pipeline resubmitted");
        }
        Ok(id)
    }

    /// Fetches the current status of a pipeline from the service.
    ///
    /// A tracked pipeline's snapshot is recorded and carries its config;
    /// an untracked id is returned as fetched, without a config.
    pub async fn fetch_status(&self, id: &PipelineId) -> Result<PipelineStatus> {
        self.ctx.fetch_and_record(id).await
    }

    /// Returns every tracked entry regardless of state, ordered by id.
    #[must_use]
    pub fn get_active_pipelines(&self) -> Vec<TrackedEntry> {
        self.store.entries()
    }

    /// Returns the last recorded snapshot without contacting the service.
    #[must_use]
    pub fn get_pipeline_status(&self, id: &PipelineId) -> Option<PipelineStatus> {
        self.store.get(id)
    }

    /// Returns the tracked entry of a pipeline.
    #[must_use]
    pub fn get_entry(&self, id: &PipelineId) -> Option<TrackedEntry> {
        self.store.entry(id)
    }

    /// Removes every completed or failed entry and returns how many were removed.
    pub fn clear_inactive_pipelines(&self) -> usize {
        let removed = self.store.clear_inactive();
        for id in &removed {
            if let Some((_, handle)) = self.pollers.remove(id) {
                handle.cancel("entry cleared");
            }
        }
        if !removed.is_empty() {
            debug!(count = removed.len(), "Cleared inactive pipelines");
        }
        removed.len()
    }

    /// Stops polling a pipeline. The entry stays in the store unchanged.
    ///
    /// Returns false if the pipeline was not being polled.
    pub fn cancel(&self, id: &PipelineId) -> bool {
        match self.pollers.remove(id) {
            Some((_, handle)) if !handle.is_finished() => {
                info!(pipeline_id = %id, "Pipeline polling cancelled");
                handle.cancel("cancelled by caller")
            }
            _ => false,
        }
    }

    /// Stops polling a pipeline and drops its entry whatever its state.
    pub fn remove(&self, id: &PipelineId) -> Option<TrackedEntry> {
        if let Some((_, handle)) = self.pollers.remove(id) {
            handle.cancel("removed by caller");
        }
        self.store.remove(id)
    }

    /// Returns true if a poll task is running for the pipeline.
    #[must_use]
    pub fn is_polling(&self, id: &PipelineId) -> bool {
        self.pollers
            .get(id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Returns the number of running poll tasks.
    #[must_use]
    pub fn polling_count(&self) -> usize {
        self.prune_finished();
        self.pollers.len()
    }

    /// Cancels every poll task.
    pub fn shutdown(&self) {
        let mut cancelled = 0;
        for handle in self.pollers.iter() {
            if handle.cancel("tracker shutdown") {
                cancelled += 1;
            }
        }
        self.pollers.clear();
        if cancelled > 0 {
            info!(cancelled, "Tracker shut down");
        }
    }

    /// Cancels every poll task and waits for all of them to end.
    pub async fn shutdown_and_wait(&self) -> Vec<(PipelineId, PollExit)> {
        let handles: Vec<(PipelineId, PollHandle)> = {
            let ids: Vec<PipelineId> = self.pollers.iter().map(|e| e.key().clone()).collect();
            ids.into_iter()
                .filter_map(|id| self.pollers.remove(&id))
                .collect()
        };

        for (_, handle) in &handles {
            handle.cancel("tracker shutdown");
        }
        let (ids, joins): (Vec<_>, Vec<_>) = handles
            .into_iter()
            .map(|(id, handle)| (id, handle.join()))
            .unzip();
        ids.into_iter()
            .zip(futures::future::join_all(joins).await)
            .collect()
    }

    fn prune_finished(&self) {
        self.pollers.retain(|_, handle| !handle.is_finished());
    }
}

impl Drop for PipelineTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for PipelineTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineTracker")
            .field("config", &self.config)
            .field("tracked", &self.store.len())
            .field("polling", &self.pollers.len())
            .finish()
    }
}
