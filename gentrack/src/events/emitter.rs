//! Typed publish/subscribe over the tracker event vocabulary.

use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

use super::sink::EventSink;
use super::types::{
    ErrorEvent, EventKind, FailedEvent, ProgressEvent, StartedEvent, StatusChangeEvent,
    TrackerEvent,
};
use crate::core::PipelineStatus;

/// Handle returned by every registration, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Listener<P> = Arc<dyn Fn(&P) + Send + Sync>;

struct Channel<P> {
    listeners: RwLock<Vec<(SubscriptionId, Listener<P>)>>,
}

impl<P> Default for Channel<P> {
    fn default() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<P> Channel<P> {
    fn subscribe(&self, id: SubscriptionId, listener: Listener<P>) {
        self.listeners.write().push((id, listener));
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Calls every listener in subscription order.
    ///
    /// The list is copied first so listeners may (un)subscribe re-entrantly.
    fn deliver(&self, event_type: &str, payload: &P) {
        let snapshot: Vec<(SubscriptionId, Listener<P>)> = self.listeners.read().clone();
        for (id, listener) in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(payload))) {
                warn!(
                    event_type,
                    subscription = %id,
                    "Event listener panicked: {}",
                    panic_message(panic.as_ref())
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Publishes tracker events to registered listeners.
///
/// Each channel has its own registration method and payload type. Listeners
/// on a channel are called in subscription order, followed by the `on_any`
/// listeners. A panicking listener is logged and skipped.
#[derive(Default)]
pub struct EventEmitter {
    next_id: AtomicU64,
    started: Channel<StartedEvent>,
    progress: Channel<ProgressEvent>,
    status_change: Channel<StatusChangeEvent>,
    update: Channel<PipelineStatus>,
    completed: Channel<PipelineStatus>,
    failed: Channel<FailedEvent>,
    error: Channel<ErrorEvent>,
    any: Channel<TrackerEvent>,
}

impl EventEmitter {
    /// Creates an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Subscribes to `pipeline:started`.
    pub fn on_started<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StartedEvent) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.started.subscribe(id, Arc::new(listener));
        id
    }

    /// Subscribes to `progress`.
    pub fn on_progress<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.progress.subscribe(id, Arc::new(listener));
        id
    }

    /// Subscribes to `statusChange`.
    pub fn on_status_change<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StatusChangeEvent) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.status_change.subscribe(id, Arc::new(listener));
        id
    }

    /// Subscribes to `update`, sent with the full snapshot on every tick.
    pub fn on_update<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PipelineStatus) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.update.subscribe(id, Arc::new(listener));
        id
    }

    /// Subscribes to `pipeline:completed`.
    pub fn on_completed<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PipelineStatus) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.completed.subscribe(id, Arc::new(listener));
        id
    }

    /// Subscribes to `pipeline:failed`.
    pub fn on_failed<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&FailedEvent) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.failed.subscribe(id, Arc::new(listener));
        id
    }

    /// Subscribes to `error` (failed status fetches).
    pub fn on_error<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.error.subscribe(id, Arc::new(listener));
        id
    }

    /// Subscribes to every event.
    pub fn on_any<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&TrackerEvent) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.any.subscribe(id, Arc::new(listener));
        id
    }

    /// Forwards every event to a sink.
    pub fn attach_sink(&self, sink: Arc<dyn EventSink>) -> SubscriptionId {
        self.on_any(move |event| sink.handle(event))
    }

    /// Removes a subscription. Returns false if it was already removed.
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.started.unsubscribe(id)
            || self.progress.unsubscribe(id)
            || self.status_change.unsubscribe(id)
            || self.update.unsubscribe(id)
            || self.completed.unsubscribe(id)
            || self.failed.unsubscribe(id)
            || self.error.unsubscribe(id)
            || self.any.unsubscribe(id)
    }

    /// Returns the number of listeners on a channel, excluding `on_any` listeners.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Started => self.started.len(),
            EventKind::Progress => self.progress.len(),
            EventKind::StatusChange => self.status_change.len(),
            EventKind::Update => self.update.len(),
            EventKind::Completed => self.completed.len(),
            EventKind::Failed => self.failed.len(),
            EventKind::Error => self.error.len(),
        }
    }

    /// Delivers an event to its channel, then to `on_any` listeners.
    pub fn emit(&self, event: &TrackerEvent) {
        let event_type = event.event_type();
        match event {
            TrackerEvent::Started(payload) => self.started.deliver(event_type, payload),
            TrackerEvent::Progress(payload) => self.progress.deliver(event_type, payload),
            TrackerEvent::StatusChange(payload) => {
                self.status_change.deliver(event_type, payload);
            }
            TrackerEvent::Update(payload) => self.update.deliver(event_type, payload),
            TrackerEvent::Completed(payload) => self.completed.deliver(event_type, payload),
            TrackerEvent::Failed(payload) => self.failed.deliver(event_type, payload),
            TrackerEvent::Error(payload) => self.error.deliver(event_type, payload),
        }
        self.any.deliver(event_type, event);
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("EventEmitter");
        for kind in EventKind::ALL {
            debug.field(kind.as_str(), &self.listener_count(kind));
        }
        debug.field("any", &self.any.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineId;
    use crate::events::CollectingEventSink;
    use parking_lot::Mutex;

    fn progress(value: u32) -> TrackerEvent {
        TrackerEvent::Progress(ProgressEvent {
            pipeline_id: PipelineId::new("p"),
            progress: value,
        })
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let emitter = EventEmitter::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let calls = calls.clone();
            emitter.on_progress(move |_| calls.lock().push(name));
        }
        {
            let calls = calls.clone();
            emitter.on_any(move |_| calls.lock().push("any"));
        }

        emitter.emit(&progress(10));
        assert_eq!(*calls.lock(), vec!["first", "second", "third", "any"]);
    }

    #[test]
    fn test_typed_payload() {
        let emitter = EventEmitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            emitter.on_progress(move |e| seen.lock().push(e.progress));
        }

        emitter.emit(&progress(25));
        emitter.emit(&TrackerEvent::Started(StartedEvent {
            pipeline_id: PipelineId::new("p"),
        }));

        assert_eq!(*seen.lock(), vec![25]);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let emitter = EventEmitter::new();
        let reached = Arc::new(Mutex::new(false));

        emitter.on_progress(|_| panic!("listener bug"));
        {
            let reached = reached.clone();
            emitter.on_progress(move |_| *reached.lock() = true);
        }

        emitter.emit(&progress(1));
        assert!(*reached.lock());
    }

    #[test]
    fn test_off_is_idempotent() {
        let emitter = EventEmitter::new();
        let id = emitter.on_error(|_| {});
        assert_eq!(emitter.listener_count(EventKind::Error), 1);

        assert!(emitter.off(id));
        assert!(!emitter.off(id));
        assert_eq!(emitter.listener_count(EventKind::Error), 0);
    }

    #[test]
    fn test_listener_can_unsubscribe_itself() {
        let emitter = Arc::new(EventEmitter::new());
        let count = Arc::new(Mutex::new(0));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let id = {
            let emitter_ref = Arc::downgrade(&emitter);
            let count = count.clone();
            let slot = slot.clone();
            emitter.on_progress(move |_| {
                *count.lock() += 1;
                if let (Some(emitter), Some(id)) = (emitter_ref.upgrade(), *slot.lock()) {
                    emitter.off(id);
                }
            })
        };
        *slot.lock() = Some(id);

        emitter.emit(&progress(1));
        emitter.emit(&progress(2));
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_attach_sink() {
        let emitter = EventEmitter::new();
        let sink = Arc::new(CollectingEventSink::new());
        let id = emitter.attach_sink(sink.clone());

        emitter.emit(&progress(5));
        assert_eq!(sink.len(), 1);

        emitter.off(id);
        emitter.emit(&progress(6));
        assert_eq!(sink.len(), 1);
    }
}
