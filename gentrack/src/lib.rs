//! # Gentrack
//!
//! Client-side tracking for asynchronous content-generation pipelines
//! (3D assets, retexturing, sprite sets).
//!
//! Gentrack provides:
//!
//! - **Submission**: post a generation request and get back a pipeline id
//! - **Polling**: one cancellable task per pipeline, fetching status on a fixed interval
//! - **Status store**: last known snapshot and submitted config per pipeline
//! - **Typed events**: progress, state changes, per-tick updates, completion and failure
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gentrack::prelude::*;
//!
//! let tracker = PipelineTracker::with_http(TrackerConfig::default())?;
//! tracker.events().on_progress(|e| println!("{}: {}%", e.pipeline_id, e.progress));
//! tracker.events().on_completed(|status| println!("done: {:?}", status.results));
//!
//! let config = PipelineConfig::new()
//!     .with("prompt", "a mossy stone golem")
//!     .with("style", "low-poly");
//! let id = tracker.start_pipeline(config).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod poller;
pub mod store;
pub mod testing;
pub mod tracker;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{TrackerConfig, TransportConfig};
    pub use crate::core::{
        PipelineConfig, PipelineId, PipelineState, PipelineStatus, StageProgress, StageState,
    };
    pub use crate::errors::{Result, TrackerError};
    pub use crate::events::{
        CollectingEventSink, ErrorEvent, EventEmitter, EventKind, EventSink, FailedEvent,
        LoggingEventSink, ProgressEvent, StartedEvent, StatusChangeEvent, SubscriptionId,
        TrackerEvent,
    };
    pub use crate::store::TrackedEntry;
    pub use crate::tracker::PipelineTracker;
    #[cfg(feature = "http")]
    pub use crate::transport::HttpTransport;
    pub use crate::transport::PipelineTransport;
}
