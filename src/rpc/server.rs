//! JSON-RPC server over stdin/stdout.
//!
//! Requests are read on a helper thread and handed to the main loop over a
//! channel, so the main loop can also poll the job supervisor every
//! [`POLL_INTERVAL`] while waiting for input. Host access only ever happens
//! on the main loop.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::api::InferenceClient;
use crate::config::InbetweenConfig;
use crate::error::Result;
use crate::generation::{JobStatus, JobSupervisor, POLL_INTERVAL};
use crate::host::{FileRenderer, FrameRenderer, ProjectHost};

use super::methods::handle_request;
use super::types::{
    outcome_notification, JsonRpcError, JsonRpcErrorResponse, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, StatusParams, JSONRPC_VERSION, NOTIFY_STATUS,
};

/// State shared across all request handlers.
pub struct ServerState<R = FileRenderer> {
    /// Daemon configuration; generate params override its defaults.
    pub config: InbetweenConfig,
    /// Host the job reads frames from and inserts results into.
    pub host: ProjectHost<R>,
    /// Client used to submit jobs.
    pub client: InferenceClient,
    pub supervisor: Arc<JobSupervisor>,
    /// Flag to signal server shutdown.
    shutdown: Arc<AtomicBool>,
}

impl<R: FrameRenderer> ServerState<R> {
    /// Creates new server state.
    pub fn new(
        config: InbetweenConfig,
        host: ProjectHost<R>,
        client: InferenceClient,
        supervisor: Arc<JobSupervisor>,
    ) -> Self {
        Self {
            config,
            host,
            client,
            supervisor,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signals the server to shut down.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Returns true if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Runs the JSON-RPC server, reading from stdin and writing to stdout.
///
/// Returns after a `shutdown` request, or once stdin closes and no job is
/// running.
pub fn run_server<R: FrameRenderer>(mut state: ServerState<R>) -> Result<()> {
    let (line_tx, line_rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    let mut stdout = io::stdout();
    let mut input_open = true;
    info!("JSON-RPC server started, waiting for requests...");

    loop {
        if input_open {
            match line_rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        if let Some(response) = process_request(&line, &mut state) {
                            writeln!(stdout, "{}", response).ok();
                            stdout.flush().ok();
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("stdin closed");
                    input_open = false;
                }
            }
        } else {
            thread::sleep(POLL_INTERVAL);
        }

        for (method, params) in pump(&mut state) {
            send_notification(method, params);
        }

        if state.is_shutdown() {
            info!("Server shutdown requested");
            break;
        }
        if !input_open && !state.supervisor.state().is_running() {
            break;
        }
    }

    if let Err(e) = state.host.save() {
        warn!("Failed to save project manifest: {}", e);
    }
    info!("JSON-RPC server stopped");
    Ok(())
}

/// Polls the supervisor once and collects the notifications to emit.
///
/// A finished job is acknowledged right away so the next `generate` can
/// start, and the project manifest is saved.
pub fn pump<R: FrameRenderer>(state: &mut ServerState<R>) -> Vec<(&'static str, serde_json::Value)> {
    let status = state.supervisor.poll(&mut state.host);

    let mut notifications: Vec<_> = state
        .host
        .drain_reports()
        .into_iter()
        .map(|report| {
            let params = serde_json::to_value(StatusParams::from(report)).unwrap_or_default();
            (NOTIFY_STATUS, params)
        })
        .collect();

    if let JobStatus::Finished(outcome) = status {
        notifications.push(outcome_notification(&outcome));
        state.supervisor.acknowledge();
        if let Err(e) = state.host.save() {
            warn!("Failed to save project manifest: {}", e);
        }
    }
    notifications
}

/// Processes a single JSON-RPC request line.
fn process_request<R: FrameRenderer>(line: &str, state: &mut ServerState<R>) -> Option<String> {
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            let error = JsonRpcErrorResponse::new(
                None,
                JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
            );
            return Some(serde_json::to_string(&error).unwrap_or_default());
        }
    };

    if request.jsonrpc != JSONRPC_VERSION {
        let error = JsonRpcErrorResponse::new(
            Some(request.id),
            JsonRpcError::invalid_request("Invalid JSON-RPC version (expected 2.0)"),
        );
        return Some(serde_json::to_string(&error).unwrap_or_default());
    }

    debug!(method = %request.method, "Handling request");
    match handle_request(&request.method, request.params, state) {
        Ok(result) => {
            serde_json::to_string(&JsonRpcResponse::new(request.id, result)).ok()
        }
        Err(error) => Some(
            serde_json::to_string(&JsonRpcErrorResponse::new(Some(request.id), error))
                .unwrap_or_default(),
        ),
    }
}

/// Sends a JSON-RPC notification to stdout.
pub fn send_notification<T: serde::Serialize>(method: &'static str, params: T) {
    let notification = JsonRpcNotification::new(method, params);
    if let Ok(json) = serde_json::to_string(&notification) {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", json).ok();
        stdout.flush().ok();
    }
}
