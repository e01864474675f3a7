//! JSON-RPC module for daemon communication.
//!
//! Provides the JSON-RPC 2.0 server implementation for:
//! - `generate`: Start an in-betweening job
//! - `status`: Current job state
//! - `cancel`: Cancel the running job
//! - `ping`: Health check
//! - `shutdown`: Graceful shutdown
//!
//! Notifications:
//! - `inbetween_status`: Status messages while a job runs
//! - `inbetween_complete`: Frames inserted
//! - `inbetween_error`: Job failed
//! - `inbetween_cancelled`: Job cancelled

pub mod methods;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use server::{pump, run_server, send_notification, ServerState};
pub use types::{
    outcome_notification, CancelResult, CancelledParams, CompleteParams, ErrorParams,
    GenerateParams, GenerateResult, JsonRpcError, JsonRpcErrorResponse, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, RequestId, StatusParams, StatusResult,
};
