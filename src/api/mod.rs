//! Inference service client.
//!
//! - [`InferenceClient`]: multipart POST to the hosted or local endpoint
//! - [`Submitter`]: the seam the job supervisor submits through
//! - [`parse_response`]: status/body handling of the frame-inbetween protocol

pub mod client;
pub mod response;

pub use client::{InferenceClient, Submitter, API_KEY_HEADER, REQUEST_TIMEOUT};
pub use response::parse_response;
