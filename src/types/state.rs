//! Lifecycle state of the single in-betweening job.

use serde::{Deserialize, Serialize};

/// State of the process-wide job slot.
///
/// `Idle -> Running -> (Completed | Failed | Cancelled) -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// No job; a new one may start.
    #[default]
    Idle,
    /// A job is rendering, waiting on the service, or inserting frames.
    Running,
    /// All returned frames were inserted.
    Completed,
    /// The service call or an insertion failed.
    Failed,
    /// Cancellation was requested while running.
    Cancelled,
}

impl JobState {
    /// Returns true if the job reached an outcome that still needs acknowledging.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }

    /// Returns true while the background job is active.
    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running)
    }

    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_state_terminal() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Idle.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }

    #[test]
    fn job_state_serializes_lowercase() {
        let json = serde_json::to_string(&JobState::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        assert_eq!(JobState::default(), JobState::Idle);
    }
}
