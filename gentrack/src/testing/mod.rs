//! Testing utilities for code built on the tracker.
//!
//! This module provides:
//! - A scripted fake transport
//! - Snapshot builders
//! - Assertions over collected events

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_event_count, assert_same_config, assert_terminal};
pub use fixtures::{init_test_tracing, snapshot, SnapshotBuilder};
pub use mocks::{FetchStep, ScriptedTransport};
