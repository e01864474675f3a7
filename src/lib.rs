//! inbetween-daemon: in-between frame generation for animation timelines.
//!
//! Renders two keyframes, sends them to a frame-interpolation service (hosted
//! or local) and places the returned frames on the host's timeline, one
//! frame per timeline slot, starting at the first keyframe.
//!
//! # Modules
//!
//! - [`types`]: Core data types (JobRequest, JobState, FrameAsset, TimelineEntry)
//! - [`config`]: Runtime configuration (InbetweenConfig, EndpointConfig)
//! - [`error`]: Error types and codes (InbetweenError, ErrorCode)
//! - [`api`]: Inference service client
//! - [`host`]: Host collaborator traits and standalone implementations
//! - [`generation`]: Job supervisor and timeline insertion
//! - [`rpc`]: JSON-RPC daemon mode
//!
//! # Example
//!
//! ```rust,ignore
//! use inbetween_daemon::{
//!     api::InferenceClient,
//!     config::InbetweenConfig,
//!     generation::{JobSupervisor, POLL_INTERVAL},
//!     host::{FileRenderer, ProjectHost},
//!     types::JobRequest,
//! };
//!
//! let config = InbetweenConfig::from_env();
//! let request = JobRequest::from_config(&config)?;
//! let mut host = ProjectHost::new(FileRenderer::new("renders"));
//!
//! let supervisor = JobSupervisor::global();
//! supervisor.start_job(request, InferenceClient::new()?)?;
//! let outcome = supervisor.wait_for_outcome(&mut host, POLL_INTERVAL);
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod host;
pub mod rpc;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use config::{EndpointConfig, InbetweenConfig};
pub use error::{ErrorCode, InbetweenError, Result};
pub use generation::{JobOutcome, JobStatus, JobSupervisor};
pub use types::{FrameAsset, JobRequest, JobResult, JobState, TimelineEntry};
