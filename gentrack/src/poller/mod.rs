//! Per-pipeline polling.
//!
//! Each tracked pipeline gets one spawned task that fetches its status on a
//! fixed interval, records the snapshot, emits the tick's events and stops
//! when the pipeline reaches a terminal state or its token is cancelled.
//! Fetch errors are emitted as `error` events and never end the loop.

mod diff;

pub use diff::{tick_events, Observed, SnapshotDiff};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::cancellation::CancellationToken;
use crate::core::{PipelineId, PipelineState, PipelineStatus};
use crate::errors::{Result, TrackerError};
use crate::events::{ErrorEvent, EventEmitter, TrackerEvent};
use crate::observability::PipelineSpanAttributes;
use crate::store::StatusStore;
use crate::transport::PipelineTransport;

/// How a poll task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// The pipeline completed.
    Completed,
    /// The service reported the pipeline as failed.
    Failed,
    /// The task was cancelled before a terminal state was seen.
    Cancelled,
}

/// Everything a poll task shares with its tracker.
#[derive(Clone)]
pub struct PollContext {
    transport: Arc<dyn PipelineTransport>,
    store: Arc<StatusStore>,
    emitter: Arc<EventEmitter>,
    interval: Duration,
}

impl PollContext {
    /// Creates a context.
    #[must_use]
    pub fn new(
        transport: Arc<dyn PipelineTransport>,
        store: Arc<StatusStore>,
        emitter: Arc<EventEmitter>,
        interval: Duration,
    ) -> Self {
        Self {
            transport,
            store,
            emitter,
            interval,
        }
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn PipelineTransport> {
        &self.transport
    }

    /// Returns the delay between ticks.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetches a snapshot and records it if the pipeline is tracked.
    ///
    /// The returned snapshot carries the stored config. A response for a
    /// different id is a fetch error. On failure the store is left untouched.
    pub async fn fetch_and_record(&self, id: &PipelineId) -> Result<PipelineStatus> {
        let fetched = self.transport.fetch(id).await?;
        if fetched.id != *id {
            return Err(TrackerError::Fetch(format!(
                "status response id mismatch: requested {id}, got {}",
                fetched.id
            )));
        }
        match self.store.record(fetched.clone()) {
            Some(stored) => Ok(stored),
            None => Ok(fetched.with_config(None)),
        }
    }
}

/// Handle to a running poll task.
#[derive(Debug)]
pub struct PollHandle {
    token: Arc<CancellationToken>,
    task: JoinHandle<PollExit>,
}

impl PollHandle {
    /// Requests the task to stop. Returns false if already requested.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        self.token.cancel(reason)
    }

    /// Returns true if the task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the task to end.
    pub async fn join(self) -> PollExit {
        self.task.await.unwrap_or(PollExit::Cancelled)
    }
}

/// Spawns the poll task for a pipeline. The first fetch happens immediately.
#[must_use]
pub fn spawn(ctx: PollContext, id: PipelineId) -> PollHandle {
    let token = Arc::new(CancellationToken::new());
    let attributes = PipelineSpanAttributes::new(id.as_str()).with_interval(ctx.interval);
    let span = attributes.span();

    let task = {
        let token = token.clone();
        tokio::spawn(async move { run(ctx, id, token).await }.instrument(span))
    };
    PollHandle { token, task }
}

async fn run(ctx: PollContext, id: PipelineId, token: Arc<CancellationToken>) -> PollExit {
    let mut last_seen: Option<Observed> = None;
    let mut tick: u64 = 0;

    loop {
        tick += 1;
        let fetched = tokio::select! {
            biased;
            () = token.cancelled() => return cancelled(&id, &token),
            result = ctx.fetch_and_record(&id) => result,
        };

        match fetched {
            Ok(snapshot) => {
                debug!(
                    tick,
                    status = %snapshot.status,
                    progress = snapshot.progress,
                    "Fetched pipeline status"
                );
                let events = tick_events(last_seen, &snapshot);
                last_seen = Some(Observed::of(&snapshot));
                for event in &events {
                    ctx.emitter.emit(event);
                }

                match snapshot.status {
                    PipelineState::Completed => {
                        info!(tick, "Pipeline completed");
                        return PollExit::Completed;
                    }
                    PipelineState::Failed => {
                        info!(tick, error = ?snapshot.error, "Pipeline failed");
                        return PollExit::Failed;
                    }
                    PipelineState::Initializing | PipelineState::Processing => {}
                }
            }
            Err(err) => {
                warn!(tick, error = %err, "Status fetch failed, will retry");
                ctx.emitter.emit(&TrackerEvent::Error(ErrorEvent {
                    pipeline_id: id.clone(),
                    error: err.to_string(),
                }));
            }
        }

        tokio::select! {
            biased;
            () = token.cancelled() => return cancelled(&id, &token),
            () = tokio::time::sleep(ctx.interval) => {}
        }
    }
}

fn cancelled(id: &PipelineId, token: &CancellationToken) -> PollExit {
    debug!(pipeline_id = %id, reason = ?token.reason(), "Polling cancelled");
    PollExit::Cancelled
}
