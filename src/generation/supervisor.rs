//! Single-slot job supervisor.
//!
//! At most one in-betweening job exists per process. `start_job` moves the
//! slot to `Running` before it returns and hands the slow work to a worker
//! thread. The host calls [`JobSupervisor::poll`] from its interactive
//! context every [`POLL_INTERVAL`]; all host mutation (rendering, resolution,
//! timeline insertion, visibility) happens inside `poll`.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::api::Submitter;
use crate::error::{ErrorCode, InbetweenError, Result};
use crate::host::{Host, ReportLevel};
use crate::types::{JobRequest, JobState};

use super::insertion::{apply_frames, ensure_visibility, InsertionReport, VISIBILITY_TARGET};
use super::job::{run_job, JobContext, JobEvent, JobPayload};
use super::CancelToken;

/// How often the host should call `poll` while a job is running.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Identifies a started job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: u64,
}

/// How a job ended.
#[derive(Debug)]
pub enum JobOutcome {
    Completed {
        job_id: u64,
        report: InsertionReport,
        output_dir: PathBuf,
        width: u32,
        height: u32,
    },
    Failed {
        job_id: u64,
        error: InbetweenError,
        /// Present when the response arrived but insertion stopped early.
        report: Option<InsertionReport>,
    },
    Cancelled {
        job_id: u64,
    },
}

impl JobOutcome {
    pub fn job_id(&self) -> u64 {
        match self {
            JobOutcome::Completed { job_id, .. }
            | JobOutcome::Failed { job_id, .. }
            | JobOutcome::Cancelled { job_id } => *job_id,
        }
    }

    /// Terminal state this outcome puts the slot in.
    pub fn state(&self) -> JobState {
        match self {
            JobOutcome::Completed { .. } => JobState::Completed,
            JobOutcome::Failed { .. } => JobState::Failed,
            JobOutcome::Cancelled { .. } => JobState::Cancelled,
        }
    }
}

/// Result of one `poll` call.
#[derive(Debug)]
pub enum JobStatus {
    Idle,
    Running,
    /// The job just reached a terminal state. Returned once per job.
    Finished(JobOutcome),
    /// Terminal state already reported; waiting for `acknowledge`.
    Settled(JobState),
}

#[derive(Debug, Default)]
struct JobSlot {
    state: JobState,
    job_id: u64,
    request: Option<JobRequest>,
    cancel: CancelToken,
    outcome: Option<JobOutcome>,
}

pub struct JobSupervisor {
    slot: Mutex<JobSlot>,
    events_tx: Sender<JobEvent>,
    events_rx: Mutex<Receiver<JobEvent>>,
}

impl Default for JobSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl JobSupervisor {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            slot: Mutex::new(JobSlot::default()),
            events_tx,
            events_rx: Mutex::new(events_rx),
        }
    }

    /// The process-wide supervisor.
    pub fn global() -> Arc<JobSupervisor> {
        static GLOBAL: OnceLock<Arc<JobSupervisor>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(JobSupervisor::new())).clone()
    }

    pub fn state(&self) -> JobState {
        lock(&self.slot).state
    }

    /// Id of the current (or last) job, if any was started.
    pub fn current_job(&self) -> Option<u64> {
        let slot = lock(&self.slot);
        (slot.job_id > 0).then_some(slot.job_id)
    }

    /// Request of the job occupying the slot.
    pub fn current_request(&self) -> Option<JobRequest> {
        lock(&self.slot).request.clone()
    }

    /// Starts a job if the slot is idle.
    ///
    /// The state is `Running` when this returns `Ok`. A slot holding an
    /// unacknowledged terminal state counts as busy.
    pub fn start_job<S: Submitter>(&self, request: JobRequest, submitter: S) -> Result<JobHandle> {
        request.validate()?;

        let mut slot = lock(&self.slot);
        if slot.state != JobState::Idle {
            warn!(state = %slot.state, "Rejected start: in-betweening job already in progress");
            return Err(InbetweenError::already_running());
        }

        slot.job_id += 1;
        slot.state = JobState::Running;
        slot.cancel = CancelToken::new();
        slot.request = Some(request.clone());
        slot.outcome = None;

        let job_id = slot.job_id;
        let ctx = JobContext::new(job_id, self.events_tx.clone(), slot.cancel.clone());
        drop(slot);

        info!(
            job_id,
            start_frame = request.start_frame,
            end_frame = request.end_frame,
            endpoint = request.endpoint.label(),
            "In-betweening job started"
        );
        thread::spawn(move || run_job(ctx, request, submitter));

        Ok(JobHandle { job_id })
    }

    /// Requests cancellation of the running job.
    ///
    /// The state becomes `Cancelled` immediately; the worker stops at its
    /// next checkpoint and any late result is discarded. Returns false if
    /// nothing was running.
    pub fn cancel(&self) -> bool {
        let mut slot = lock(&self.slot);
        if !slot.state.is_running() {
            return false;
        }
        slot.cancel.cancel();
        slot.state = JobState::Cancelled;
        slot.outcome = Some(JobOutcome::Cancelled {
            job_id: slot.job_id,
        });
        info!(job_id = slot.job_id, "Cancelling in-betweening process...");
        true
    }

    /// Returns a terminal slot to `Idle` so a new job can start.
    pub fn acknowledge(&self) -> JobState {
        let mut slot = lock(&self.slot);
        if slot.state.is_terminal() {
            debug!(job_id = slot.job_id, state = %slot.state, "Job acknowledged");
            slot.state = JobState::Idle;
            slot.request = None;
            slot.outcome = None;
        }
        slot.state
    }

    /// Processes worker events on the caller's (interactive) thread.
    pub fn poll<H: Host + ?Sized>(&self, host: &mut H) -> JobStatus {
        loop {
            let event = match lock(&self.events_rx).try_recv() {
                Ok(event) => event,
                Err(_) => break,
            };
            self.handle_event(event, host);
        }

        let mut slot = lock(&self.slot);
        let state = slot.state;
        match state {
            JobState::Idle => JobStatus::Idle,
            JobState::Running => JobStatus::Running,
            terminal => match slot.outcome.take() {
                Some(outcome) => {
                    drop(slot);
                    if let JobOutcome::Cancelled { .. } = outcome {
                        host.report(ReportLevel::Info, "In-betweening process cancelled");
                    }
                    JobStatus::Finished(outcome)
                }
                None => JobStatus::Settled(terminal),
            },
        }
    }

    /// Polls every `interval` until the current job finishes.
    ///
    /// Returns `None` if no job was running.
    pub fn wait_for_outcome<H: Host + ?Sized>(
        &self,
        host: &mut H,
        interval: Duration,
    ) -> Option<JobOutcome> {
        loop {
            match self.poll(host) {
                JobStatus::Running => thread::sleep(interval),
                JobStatus::Finished(outcome) => return Some(outcome),
                JobStatus::Idle | JobStatus::Settled(_) => return None,
            }
        }
    }

    fn handle_event<H: Host + ?Sized>(&self, event: JobEvent, host: &mut H) {
        let (current, running) = {
            let slot = lock(&self.slot);
            (slot.job_id, slot.state.is_running())
        };
        if event.job_id() != current || !running {
            debug!(job_id = event.job_id(), "Discarding event from inactive job");
            return;
        }

        match event {
            JobEvent::Status { level, message, .. } => host.report(level, &message),
            JobEvent::Render { frame, reply, .. } => {
                let rendered = host.render_frame(frame);
                if let Err(e) = &rendered {
                    host.report(ReportLevel::Error, &e.message);
                }
                let _ = reply.send(rendered);
            }
            JobEvent::Finished { job_id, outcome } => self.finish(job_id, outcome, host),
        }
    }

    fn finish<H: Host + ?Sized>(&self, job_id: u64, outcome: Result<JobPayload>, host: &mut H) {
        let (start_frame, cancel) = {
            let slot = lock(&self.slot);
            let start_frame = slot.request.as_ref().map(|r| r.start_frame).unwrap_or_default();
            (start_frame, slot.cancel.clone())
        };

        let outcome = match outcome {
            Ok(JobPayload { result, output_dir }) => {
                host.set_resolution(result.width, result.height);
                let report = apply_frames(&result.frames, start_frame, &output_dir.path, host, &cancel);
                ensure_visibility(host, VISIBILITY_TARGET);

                if report.is_complete() {
                    host.report(
                        ReportLevel::Info,
                        &format!("Generated {} in-between frames", report.inserted.len()),
                    );
                    JobOutcome::Completed {
                        job_id,
                        report,
                        output_dir: output_dir.path,
                        width: result.width,
                        height: result.height,
                    }
                } else if let Some(failure) = &report.failure {
                    let error = InbetweenError::new(
                        failure.error.code,
                        format!(
                            "Insertion stopped at frame {} ({} of {} inserted): {}",
                            failure.frame_number,
                            report.inserted.len(),
                            report.requested,
                            failure.error.message
                        ),
                    );
                    error!(job_id, error = %error, "In-betweening job failed");
                    JobOutcome::Failed {
                        job_id,
                        error,
                        report: Some(report),
                    }
                } else {
                    JobOutcome::Cancelled { job_id }
                }
            }
            Err(e) if e.code == ErrorCode::Cancelled => JobOutcome::Cancelled { job_id },
            Err(error) => {
                host.report(ReportLevel::Error, &error.message);
                error!(job_id, error = %error, "In-betweening job failed");
                JobOutcome::Failed {
                    job_id,
                    error,
                    report: None,
                }
            }
        };

        let mut slot = lock(&self.slot);
        if slot.job_id == job_id && slot.state.is_running() {
            info!(job_id, state = %outcome.state(), "In-betweening job finished");
            slot.state = outcome.state();
            slot.outcome = Some(outcome);
        } else {
            debug!(job_id, "Job was cancelled while its result was applied");
        }
    }
}
