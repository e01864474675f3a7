//! Core types for the inbetween-daemon.
//!
//! This module re-exports all the core data types used throughout the daemon:
//! - [`JobRequest`]: Immutable parameters of one in-betweening job
//! - [`JobState`]: Lifecycle of the single job slot
//! - [`FrameAsset`] / [`JobResult`]: Frames returned by the inference service
//! - [`TimelineEntry`]: An image placed on the timeline

mod frame;
mod request;
mod state;
mod timeline;

// Re-export all types at the module level
pub use frame::{FrameAsset, ImageFormat, JobResult};
pub use request::{
    JobRequest, CFG_SCALE_RANGE, DIMENSION_RANGE, ETA_RANGE, FRAME_RANGE, FRAME_STRIDE_RANGE,
    STEPS_RANGE,
};
pub use state::JobState;
pub use timeline::{EntryId, TimelineEntry};
