//! Core domain model types for the tracker.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Pipeline identifiers and caller-supplied configs
//! - Pipeline and stage state enums
//! - Status snapshots returned by the generation service

mod id;
mod pipeline_config;
mod snapshot;
mod status;

pub use id::PipelineId;
pub use pipeline_config::PipelineConfig;
pub use snapshot::{
    PipelineStatus, StageProgress, DEFAULT_STAGES, STAGE_GENERATION, STAGE_RETEXTURING,
    STAGE_SPRITES,
};
pub use status::{PipelineState, StageState};
