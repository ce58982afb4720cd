//! Event sink trait and implementations.

use parking_lot::RwLock;
use tracing::{debug, info, Level};

use super::types::{EventKind, TrackerEvent};

/// Trait for sinks that receive every tracker event.
///
/// Sinks are attached with
/// [`EventEmitter::attach_sink`](super::EventEmitter::attach_sink) and are
/// called on the task that emitted the event, so they must not block.
pub trait EventSink: Send + Sync {
    /// Handles one event.
    fn handle(&self, event: &TrackerEvent);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn handle(&self, _event: &TrackerEvent) {}
}

/// An event sink that logs events using the tracing framework.
///
/// `update` events fire on every poll tick and are always logged at debug.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn handle(&self, event: &TrackerEvent) {
        let event_type = event.event_type();
        let pipeline_id = event.pipeline_id();
        let data = serde_json::to_value(event).ok();

        if self.level == Level::DEBUG || event.kind() == EventKind::Update {
            debug!(%event_type, %pipeline_id, event_data = ?data, "Event: {}", event_type);
        } else {
            info!(%event_type, %pipeline_id, event_data = ?data, "Event: {}", event_type);
        }
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<TrackerEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<TrackerEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events delivered on one channel.
    #[must_use]
    pub fn events_of_kind(&self, kind: EventKind) -> Vec<TrackerEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    /// Returns the number of events delivered on one channel.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.read().iter().filter(|e| e.kind() == kind).count()
    }

    /// Returns the wire names of all collected events, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.read().iter().map(TrackerEvent::event_type).collect()
    }
}

impl EventSink for CollectingEventSink {
    fn handle(&self, event: &TrackerEvent) {
        self.events.write().push(event.clone());
    }
}
