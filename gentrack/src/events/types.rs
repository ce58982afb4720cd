//! Tracker event vocabulary.

use serde::Serialize;
use std::fmt;

use crate::core::{PipelineId, PipelineState, PipelineStatus};

/// Payload of `pipeline:started`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedEvent {
    /// The newly assigned pipeline id.
    pub pipeline_id: PipelineId,
}

/// Payload of `progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Pipeline id.
    pub pipeline_id: PipelineId,
    /// New overall progress.
    pub progress: u32,
}

/// Payload of `statusChange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeEvent {
    /// Pipeline id.
    pub pipeline_id: PipelineId,
    /// New overall state.
    pub status: PipelineState,
}

/// Payload of `pipeline:failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEvent {
    /// Pipeline id.
    pub pipeline_id: PipelineId,
    /// Failure message reported by the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload of `error`: one status fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    /// Pipeline id.
    pub pipeline_id: PipelineId,
    /// Fetch failure message.
    pub error: String,
}

/// Names of the event channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `pipeline:started`
    Started,
    /// `progress`
    Progress,
    /// `statusChange`
    StatusChange,
    /// `update`
    Update,
    /// `pipeline:completed`
    Completed,
    /// `pipeline:failed`
    Failed,
    /// `error`
    Error,
}

impl EventKind {
    /// All channels, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Started,
        Self::Progress,
        Self::StatusChange,
        Self::Update,
        Self::Completed,
        Self::Failed,
        Self::Error,
    ];

    /// Returns the wire name of the event.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "pipeline:started",
            Self::Progress => "progress",
            Self::StatusChange => "statusChange",
            Self::Update => "update",
            Self::Completed => "pipeline:completed",
            Self::Failed => "pipeline:failed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event published by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum TrackerEvent {
    /// A pipeline was submitted and is now tracked.
    #[serde(rename = "pipeline:started")]
    Started(StartedEvent),
    /// Overall progress changed.
    #[serde(rename = "progress")]
    Progress(ProgressEvent),
    /// Overall state changed.
    #[serde(rename = "statusChange")]
    StatusChange(StatusChangeEvent),
    /// A snapshot was fetched; sent on every successful tick.
    #[serde(rename = "update")]
    Update(PipelineStatus),
    /// The pipeline completed.
    #[serde(rename = "pipeline:completed")]
    Completed(PipelineStatus),
    /// The service reported the pipeline as failed.
    #[serde(rename = "pipeline:failed")]
    Failed(FailedEvent),
    /// A status fetch failed; polling continues.
    #[serde(rename = "error")]
    Error(ErrorEvent),
}

impl TrackerEvent {
    /// Returns the channel this event is delivered on.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Started(_) => EventKind::Started,
            Self::Progress(_) => EventKind::Progress,
            Self::StatusChange(_) => EventKind::StatusChange,
            Self::Update(_) => EventKind::Update,
            Self::Completed(_) => EventKind::Completed,
            Self::Failed(_) => EventKind::Failed,
            Self::Error(_) => EventKind::Error,
        }
    }

    /// Returns the wire name of the event.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Returns the pipeline the event concerns.
    #[must_use]
    pub fn pipeline_id(&self) -> &PipelineId {
        match self {
            Self::Started(e) => &e.pipeline_id,
            Self::Progress(e) => &e.pipeline_id,
            Self::StatusChange(e) => &e.pipeline_id,
            Self::Update(s) | Self::Completed(s) => &s.id,
            Self::Failed(e) => &e.pipeline_id,
            Self::Error(e) => &e.pipeline_id,
        }
    }
}
