//! Error types for the inbetween-daemon.
//!
//! Defines all error codes and types used throughout the daemon for
//! consistent error handling and status reporting.

use std::fmt;

/// Error codes attached to every [`InbetweenError`].
///
/// These codes are surfaced in status messages and JSON-RPC error responses
/// so clients can react to specific failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A job was requested while another one is still active.
    /// Trigger: `generate` while the supervisor is not idle.
    AlreadyRunning,

    /// Generation parameters are outside their allowed bounds.
    InvalidRequest,

    /// The host failed to render an endpoint frame.
    /// Trigger: missing pre-rendered image, renderer error.
    RenderFailed,

    /// The inference service could not be reached.
    /// Trigger: connection refused, DNS failure, 1000s timeout.
    ApiUnreachable,

    /// The inference service answered with a non-200 status.
    ApiStatus,

    /// The inference service answered 200 with an unusable body.
    /// Trigger: invalid JSON, missing `frames`/`width`/`height`.
    ApiMalformed,

    /// A returned frame is not valid base64.
    DecodeFailed,

    /// A decoded frame could not be written to disk.
    PersistFailed,

    /// The timeline rejected an image or entry.
    TimelineInsertFailed,

    /// The per-job output directory could not be created.
    /// Non-fatal: the base output directory is used instead.
    DirectoryCreateFailed,

    /// The job was cancelled before it reached a terminal outcome.
    Cancelled,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AlreadyRunning => "ALREADY_RUNNING",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::RenderFailed => "RENDER_FAILED",
            ErrorCode::ApiUnreachable => "API_UNREACHABLE",
            ErrorCode::ApiStatus => "API_STATUS",
            ErrorCode::ApiMalformed => "API_MALFORMED",
            ErrorCode::DecodeFailed => "DECODE_FAILED",
            ErrorCode::PersistFailed => "PERSIST_FAILED",
            ErrorCode::TimelineInsertFailed => "TIMELINE_INSERT_FAILED",
            ErrorCode::DirectoryCreateFailed => "DIRECTORY_CREATE_FAILED",
            ErrorCode::Cancelled => "CANCELLED",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::AlreadyRunning => "An in-betweening job is already running",
            ErrorCode::InvalidRequest => "Generation parameters are out of range",
            ErrorCode::RenderFailed => "Failed to render an endpoint frame",
            ErrorCode::ApiUnreachable => "Inference service could not be reached",
            ErrorCode::ApiStatus => "Inference service returned an error status",
            ErrorCode::ApiMalformed => "Inference service returned a malformed response",
            ErrorCode::DecodeFailed => "Returned frame is not valid base64",
            ErrorCode::PersistFailed => "Failed to write a frame to disk",
            ErrorCode::TimelineInsertFailed => "Timeline rejected an inserted frame",
            ErrorCode::DirectoryCreateFailed => "Failed to create the job output directory",
            ErrorCode::Cancelled => "The job was cancelled",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::AlreadyRunning => {
                "Wait for the current job to finish, or cancel it before starting a new one"
            }
            ErrorCode::InvalidRequest => {
                "Keep eta in 0-1, cfg scale in 1-15, steps in 1-60, frame stride in 1-30 \
                 and width/height in 64-5000"
            }
            ErrorCode::RenderFailed => {
                "Check that the endpoint frames exist and can be rendered \
                 (e.g. frames directory contains 0001.png)"
            }
            ErrorCode::ApiUnreachable => {
                "Check the network connection, or that the local server is running \
                 at the configured address"
            }
            ErrorCode::ApiStatus => {
                "Verify the API key for the hosted model, or inspect the local server logs"
            }
            ErrorCode::ApiMalformed => {
                "Make sure the endpoint speaks the frame-inbetween protocol \
                 (JSON with frames, width and height)"
            }
            ErrorCode::DecodeFailed => "Re-run the job; the service sent a corrupt frame",
            ErrorCode::PersistFailed => {
                "Check free disk space and write permissions on the output directory"
            }
            ErrorCode::TimelineInsertFailed => {
                "Check the timeline for locked channels and that the written image is readable"
            }
            ErrorCode::DirectoryCreateFailed => {
                "Frames were written to the base output directory instead; \
                 check its permissions"
            }
            ErrorCode::Cancelled => "Start a new job when ready",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for in-betweening operations.
#[derive(Debug)]
pub struct InbetweenError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// HTTP status returned by the inference service, for `ApiStatus`.
    pub status_code: Option<u16>,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl InbetweenError {
    /// Creates a new InbetweenError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status_code: None,
            source: None,
        }
    }

    /// Creates a new InbetweenError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            status_code: None,
            source: Some(Box::new(source)),
        }
    }

    /// Creates an ALREADY_RUNNING error.
    pub fn already_running() -> Self {
        Self::new(
            ErrorCode::AlreadyRunning,
            "An in-betweening job is already in progress",
        )
    }

    /// Creates an INVALID_REQUEST error for a field outside its bounds.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, reason)
    }

    /// Creates a RENDER_FAILED error.
    pub fn render_failed(frame: i32, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::RenderFailed,
            format!("Failed to render frame {}: {}", frame, reason.into()),
        )
    }

    /// Creates an API_UNREACHABLE error from a transport failure.
    pub fn api_unreachable(
        url: &str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::with_source(
            ErrorCode::ApiUnreachable,
            format!("Failed to reach inference service at {}", url),
            source,
        )
    }

    /// Creates an API_STATUS error carrying the HTTP status code.
    pub fn api_status(status_code: u16) -> Self {
        Self {
            status_code: Some(status_code),
            ..Self::new(
                ErrorCode::ApiStatus,
                format!(
                    "Failed to generate in-betweens. Status code: {}",
                    status_code
                ),
            )
        }
    }

    /// Creates an API_MALFORMED error.
    pub fn api_malformed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ApiMalformed,
            format!("Malformed inference response: {}", reason.into()),
        )
    }

    /// Creates a DECODE_FAILED error.
    pub fn decode_failed(source: base64::DecodeError) -> Self {
        Self::with_source(
            ErrorCode::DecodeFailed,
            format!("Invalid base64 frame data: {}", source),
            source,
        )
    }

    /// Creates a PERSIST_FAILED error.
    pub fn persist_failed(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::with_source(
            ErrorCode::PersistFailed,
            format!("Failed to write {}: {}", path.display(), source),
            source,
        )
    }

    /// Creates a TIMELINE_INSERT_FAILED error.
    pub fn timeline_insert_failed(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::TimelineInsertFailed, reason)
    }

    /// Creates a DIRECTORY_CREATE_FAILED error.
    pub fn directory_create_failed(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::with_source(
            ErrorCode::DirectoryCreateFailed,
            format!("Failed to create directory {}: {}", path.display(), source),
            source,
        )
    }

    /// Creates a CANCELLED error.
    pub fn cancelled(stage: &str) -> Self {
        Self::new(
            ErrorCode::Cancelled,
            format!("Job cancelled {}", stage),
        )
    }
}

impl fmt::Display for InbetweenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for InbetweenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using InbetweenError.
pub type Result<T> = std::result::Result<T, InbetweenError>;

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CODES: [ErrorCode; 11] = [
        ErrorCode::AlreadyRunning,
        ErrorCode::InvalidRequest,
        ErrorCode::RenderFailed,
        ErrorCode::ApiUnreachable,
        ErrorCode::ApiStatus,
        ErrorCode::ApiMalformed,
        ErrorCode::DecodeFailed,
        ErrorCode::PersistFailed,
        ErrorCode::TimelineInsertFailed,
        ErrorCode::DirectoryCreateFailed,
        ErrorCode::Cancelled,
    ];

    #[test]
    fn error_code_as_str() {
        assert_eq!(ErrorCode::AlreadyRunning.as_str(), "ALREADY_RUNNING");
        assert_eq!(ErrorCode::ApiStatus.as_str(), "API_STATUS");
        assert_eq!(ErrorCode::ApiMalformed.as_str(), "API_MALFORMED");
        assert_eq!(ErrorCode::TimelineInsertFailed.as_str(), "TIMELINE_INSERT_FAILED");
        assert_eq!(ErrorCode::DirectoryCreateFailed.as_str(), "DIRECTORY_CREATE_FAILED");
    }

    #[test]
    fn error_code_hints_and_descriptions_not_empty() {
        for code in ALL_CODES {
            assert!(!code.recovery_hint().is_empty(), "{} has no hint", code);
            assert!(!code.description().is_empty(), "{} has no description", code);
        }
    }

    #[test]
    fn api_status_carries_code() {
        let err = InbetweenError::api_status(500);
        assert_eq!(err.code, ErrorCode::ApiStatus);
        assert_eq!(err.status_code, Some(500));
        assert!(err.to_string().contains("Status code: 500"));
        assert!(err.to_string().contains("Recovery:"));
    }

    #[test]
    fn source_is_chained() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = InbetweenError::persist_failed(std::path::Path::new("/x/frame_1.png"), io);
        assert_eq!(err.code, ErrorCode::PersistFailed);
        assert!(err.source().is_some());
        assert!(err.message.contains("frame_1.png"));
    }
}
