//! In-betweening job lifecycle.
//!
//! Provides the single-slot job supervisor, the background job body and the
//! timeline insertion pipeline that runs when a job's response arrives.

mod cancel;
pub mod insertion;
mod job;
pub mod output;
pub mod supervisor;

// Re-export commonly used items
pub use cancel::CancelToken;
pub use insertion::{
    apply_frames, ensure_visibility, FrameFailure, InsertedFrame, InsertionReport, INSERT_CHANNEL,
    VISIBILITY_TARGET,
};
pub use output::{create_unique_directory, OutputDirectory, OUTPUT_DIR_PREFIX};
pub use supervisor::{JobHandle, JobOutcome, JobStatus, JobSupervisor, POLL_INTERVAL};
