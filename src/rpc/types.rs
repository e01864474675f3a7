//! JSON-RPC types for the daemon protocol.

use serde::{Deserialize, Serialize};

use crate::config::GenerationDefaults;
use crate::error::{ErrorCode, InbetweenError};
use crate::generation::{InsertionReport, JobOutcome};
use crate::host::{Report, ReportLevel};
use crate::types::JobState;

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

pub const NOTIFY_STATUS: &str = "inbetween_status";
pub const NOTIFY_COMPLETE: &str = "inbetween_complete";
pub const NOTIFY_ERROR: &str = "inbetween_error";
pub const NOTIFY_CANCELLED: &str = "inbetween_cancelled";

/// A JSON-RPC request ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestId {
    Integer(i64),
    String(String),
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Integer(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

/// A JSON-RPC request wrapper.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub id: RequestId,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A JSON-RPC response wrapper.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse<T: Serialize> {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    pub result: T,
}

impl<T: Serialize> JsonRpcResponse<T> {
    pub fn new(id: RequestId, result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

/// A JSON-RPC error response.
#[derive(Debug, Serialize)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: &'static str,
    pub id: Option<RequestId>,
    pub error: JsonRpcError,
}

impl JsonRpcErrorResponse {
    pub fn new(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error,
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonRpcErrorData>,
}

/// Extended error data for application-specific errors.
#[derive(Debug, Serialize)]
pub struct JsonRpcErrorData {
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl JsonRpcError {
    /// Creates a parse error (-32700).
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
            data: None,
        }
    }

    /// Creates an invalid request error (-32600).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    /// Creates a method not found error (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {}", method),
            data: None,
        }
    }

    /// Creates an invalid params error (-32602).
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    /// Creates an internal error (-32603).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
            data: None,
        }
    }

    /// Creates an invalid configuration error (-32012).
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self {
            code: -32012,
            message: "Invalid configuration".to_string(),
            data: Some(JsonRpcErrorData {
                error_code: "INVALID_CONFIG".to_string(),
                details: Some(details.into()),
            }),
        }
    }

    /// Maps a crate error onto the daemon's error codes.
    pub fn from_inbetween(error: &InbetweenError) -> Self {
        match error.code {
            ErrorCode::AlreadyRunning => Self::application(-32010, error),
            ErrorCode::InvalidRequest => Self::application(-32011, error),
            _ => Self::application(-32603, error),
        }
    }

    fn application(code: i32, error: &InbetweenError) -> Self {
        Self {
            code,
            message: error.code.description().to_string(),
            data: Some(JsonRpcErrorData {
                error_code: error.code.as_str().to_string(),
                details: Some(error.message.clone()),
            }),
        }
    }
}

// ============================================================================
// Requests / responses
// ============================================================================

/// Parameters for a generate request. Every field overrides the daemon's
/// configured default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateParams {
    pub start_frame: Option<i32>,
    pub end_frame: Option<i32>,
    pub prompt: Option<String>,
    pub eta: Option<f32>,
    pub cfg_scale: Option<f32>,
    pub sampling_steps: Option<u32>,
    pub frame_stride: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl GenerateParams {
    /// Applies the overrides to a copy of `defaults`.
    pub fn apply(self, defaults: &GenerationDefaults) -> GenerationDefaults {
        let mut generation = defaults.clone();
        if let Some(v) = self.start_frame {
            generation.start_frame = v;
        }
        if let Some(v) = self.end_frame {
            generation.end_frame = v;
        }
        if let Some(v) = self.prompt {
            generation.prompt = v;
        }
        if let Some(v) = self.eta {
            generation.eta = v;
        }
        if let Some(v) = self.cfg_scale {
            generation.cfg_scale = v;
        }
        if let Some(v) = self.sampling_steps {
            generation.sampling_steps = v;
        }
        if let Some(v) = self.frame_stride {
            generation.frame_stride = v;
        }
        if let Some(v) = self.width {
            generation.width = v;
        }
        if let Some(v) = self.height {
            generation.height = v;
        }
        generation
    }
}

/// Response for a generate request.
#[derive(Debug, Serialize)]
pub struct GenerateResult {
    pub job_id: u64,
    pub state: JobState,
    pub start_frame: i32,
    pub end_frame: i32,
    /// Endpoint label, `hosted` or `local`.
    pub endpoint: &'static str,
}

/// Response for a status request.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_frame: Option<i32>,
}

/// Response for a cancel request.
#[derive(Debug, Serialize)]
pub struct CancelResult {
    /// False if no job was running.
    pub cancelled: bool,
    pub state: JobState,
}

// ============================================================================
// Notifications
// ============================================================================

/// A JSON-RPC notification (no id).
#[derive(Debug, Serialize)]
pub struct JsonRpcNotification<T: Serialize> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: T,
}

impl<T: Serialize> JsonRpcNotification<T> {
    pub fn new(method: &'static str, params: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
        }
    }
}

/// Parameters for `inbetween_status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusParams {
    pub level: ReportLevel,
    pub message: String,
}

impl From<Report> for StatusParams {
    fn from(report: Report) -> Self {
        Self {
            level: report.level,
            message: report.message,
        }
    }
}

/// Parameters for `inbetween_complete`.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteParams {
    pub job_id: u64,
    pub frames_inserted: usize,
    pub output_dir: String,
    pub width: u32,
    pub height: u32,
}

/// Parameters for `inbetween_error`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorParams {
    pub job_id: u64,
    pub error_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Frames placed before insertion stopped.
    pub frames_inserted: usize,
}

/// Parameters for `inbetween_cancelled`.
#[derive(Debug, Clone, Serialize)]
pub struct CancelledParams {
    pub job_id: u64,
}

/// Builds the notification announcing a finished job.
pub fn outcome_notification(outcome: &JobOutcome) -> (&'static str, serde_json::Value) {
    let params = match outcome {
        JobOutcome::Completed {
            job_id,
            report,
            output_dir,
            width,
            height,
        } => serde_json::to_value(CompleteParams {
            job_id: *job_id,
            frames_inserted: report.inserted.len(),
            output_dir: output_dir.to_string_lossy().to_string(),
            width: *width,
            height: *height,
        }),
        JobOutcome::Failed {
            job_id,
            error,
            report,
        } => serde_json::to_value(ErrorParams {
            job_id: *job_id,
            error_code: error.code.as_str().to_string(),
            message: error.message.clone(),
            status_code: error.status_code,
            frames_inserted: report.as_ref().map_or(0, |r: &InsertionReport| r.inserted.len()),
        }),
        JobOutcome::Cancelled { job_id } => {
            serde_json::to_value(CancelledParams { job_id: *job_id })
        }
    };
    let method = match outcome {
        JobOutcome::Completed { .. } => NOTIFY_COMPLETE,
        JobOutcome::Failed { .. } => NOTIFY_ERROR,
        JobOutcome::Cancelled { .. } => NOTIFY_CANCELLED,
    };
    (method, params.unwrap_or(serde_json::Value::Null))
}
