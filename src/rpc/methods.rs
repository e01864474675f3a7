//! JSON-RPC method handlers.
//!
//! Implements the handlers for all supported JSON-RPC methods.

use serde::Serialize;
use tracing::info;

use crate::host::FrameRenderer;
use crate::types::{JobRequest, JobState};

use super::server::ServerState;
use super::types::{CancelResult, GenerateParams, GenerateResult, JsonRpcError, StatusResult};

/// Handles a JSON-RPC method call.
pub fn handle_request<R: FrameRenderer>(
    method: &str,
    params: serde_json::Value,
    state: &mut ServerState<R>,
) -> Result<serde_json::Value, JsonRpcError> {
    match method {
        "generate" => handle_generate(params, state),
        "status" => handle_status(state),
        "cancel" => handle_cancel(state),
        "ping" => handle_ping(),
        "shutdown" => handle_shutdown(state),
        _ => Err(JsonRpcError::method_not_found(method)),
    }
}

fn to_result<T: Serialize>(value: T) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

/// Handles the ping method for health checks.
fn handle_ping() -> Result<serde_json::Value, JsonRpcError> {
    Ok(serde_json::json!({ "status": "ok" }))
}

/// Handles the shutdown method. A running job is cancelled first.
fn handle_shutdown<R: FrameRenderer>(
    state: &mut ServerState<R>,
) -> Result<serde_json::Value, JsonRpcError> {
    if state.supervisor.cancel() {
        info!("Cancelled running job for shutdown");
    }
    state.shutdown();
    Ok(serde_json::json!({ "status": "shutting_down" }))
}

/// Handles the generate method.
fn handle_generate<R: FrameRenderer>(
    params: serde_json::Value,
    state: &mut ServerState<R>,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: GenerateParams = if params.is_null() {
        GenerateParams::default()
    } else {
        serde_json::from_value(params)
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))?
    };

    if let Some(problem) = state.config.validate() {
        return Err(JsonRpcError::invalid_config(problem));
    }

    let mut config = state.config.clone();
    config.generation = params.apply(&state.config.generation);
    let request =
        JobRequest::from_config(&config).map_err(|e| JsonRpcError::from_inbetween(&e))?;

    let (start_frame, end_frame) = (request.start_frame, request.end_frame);
    let endpoint = request.endpoint.label();
    let handle = state
        .supervisor
        .start_job(request, state.client.clone())
        .map_err(|e| JsonRpcError::from_inbetween(&e))?;

    to_result(GenerateResult {
        job_id: handle.job_id,
        state: JobState::Running,
        start_frame,
        end_frame,
        endpoint,
    })
}

/// Handles the status method.
fn handle_status<R: FrameRenderer>(
    state: &mut ServerState<R>,
) -> Result<serde_json::Value, JsonRpcError> {
    let request = state.supervisor.current_request();
    to_result(StatusResult {
        state: state.supervisor.state(),
        job_id: request.as_ref().and(state.supervisor.current_job()),
        start_frame: request.as_ref().map(|r| r.start_frame),
        end_frame: request.as_ref().map(|r| r.end_frame),
    })
}

/// Handles the cancel method.
fn handle_cancel<R: FrameRenderer>(
    state: &mut ServerState<R>,
) -> Result<serde_json::Value, JsonRpcError> {
    let cancelled = state.supervisor.cancel();
    to_result(CancelResult {
        cancelled,
        state: state.supervisor.state(),
    })
}
