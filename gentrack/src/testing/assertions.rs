//! Test assertions for tracker events and snapshots.

use std::sync::Arc;

use crate::core::{PipelineConfig, PipelineStatus};
use crate::events::{CollectingEventSink, EventKind};

/// Asserts that exactly `expected` events were collected on a channel.
pub fn assert_event_count(sink: &CollectingEventSink, kind: EventKind, expected: usize) {
    let actual = sink.count(kind);
    assert_eq!(
        actual, expected,
        "Expected {expected} '{kind}' events, got {actual}. Events: {:?}",
        sink.event_types()
    );
}

/// Asserts that the snapshot is in a terminal state.
pub fn assert_terminal(status: &PipelineStatus) {
    assert!(
        status.is_terminal(),
        "Expected terminal status, got {}",
        status.status
    );
}

/// Asserts that the snapshot carries exactly the given config instance.
pub fn assert_same_config(status: &PipelineStatus, config: &Arc<PipelineConfig>) {
    match status.config.as_ref() {
        Some(attached) => assert!(
            Arc::ptr_eq(attached, config),
            "Snapshot for {} carries a different config instance",
            status.id
        ),
        None => panic!("Snapshot for {} carries no config", status.id),
    }
}
