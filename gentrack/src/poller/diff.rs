//! Snapshot diffing for one poll tick.

use crate::core::{PipelineState, PipelineStatus};
use crate::events::{FailedEvent, ProgressEvent, StatusChangeEvent, TrackerEvent};

/// The fields a poller compares between consecutive snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observed {
    /// Overall progress last seen.
    pub progress: u32,
    /// Overall state last seen.
    pub status: PipelineState,
}

impl Observed {
    /// Captures the compared fields of a snapshot.
    #[must_use]
    pub fn of(snapshot: &PipelineStatus) -> Self {
        Self {
            progress: snapshot.progress,
            status: snapshot.status,
        }
    }
}

/// Which compared fields changed since the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotDiff {
    /// `progress` differs (or nothing was seen before).
    pub progress_changed: bool,
    /// `status` differs (or nothing was seen before).
    pub status_changed: bool,
}

impl SnapshotDiff {
    /// Compares a new snapshot with what was last seen.
    #[must_use]
    pub fn between(previous: Option<Observed>, next: &PipelineStatus) -> Self {
        match previous {
            None => Self {
                progress_changed: true,
                status_changed: true,
            },
            Some(prev) => Self {
                progress_changed: prev.progress != next.progress,
                status_changed: prev.status != next.status,
            },
        }
    }
}

/// Builds the events for one successful tick, in delivery order.
///
/// `progress` and `statusChange` are sent only on change, `update` always,
/// then `pipeline:completed` or `pipeline:failed` for a terminal snapshot.
#[must_use]
pub fn tick_events(previous: Option<Observed>, snapshot: &PipelineStatus) -> Vec<TrackerEvent> {
    let diff = SnapshotDiff::between(previous, snapshot);
    let mut events = Vec::with_capacity(4);

    if diff.progress_changed {
        events.push(TrackerEvent::Progress(ProgressEvent {
            pipeline_id: snapshot.id.clone(),
            progress: snapshot.progress,
        }));
    }
    if diff.status_changed {
        events.push(TrackerEvent::StatusChange(StatusChangeEvent {
            pipeline_id: snapshot.id.clone(),
            status: snapshot.status,
        }));
    }
    events.push(TrackerEvent::Update(snapshot.clone()));

    match snapshot.status {
        PipelineState::Completed => events.push(TrackerEvent::Completed(snapshot.clone())),
        PipelineState::Failed => events.push(TrackerEvent::Failed(FailedEvent {
            pipeline_id: snapshot.id.clone(),
            error: snapshot.error.clone(),
        })),
        PipelineState::Initializing | PipelineState::Processing => {}
    }
    events
}
