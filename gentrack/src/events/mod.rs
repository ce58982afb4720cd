//! Tracker events and their delivery.
//!
//! This module provides the event vocabulary published by the tracker, a
//! typed emitter with one registration method per channel, and sinks that
//! receive every event for logging or assertions.

mod emitter;
mod sink;
mod types;

pub use emitter::{EventEmitter, SubscriptionId};
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
pub use types::{
    ErrorEvent, EventKind, FailedEvent, ProgressEvent, StartedEvent, StatusChangeEvent,
    TrackerEvent,
};
