//! Observability utilities.

mod logging;

pub use logging::{init_tracing, LogFormat, PipelineSpanAttributes, DEFAULT_FILTER};
