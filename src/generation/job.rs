//! Background half of an in-betweening job.
//!
//! The worker thread owns no host state. Rendering is requested from the
//! polling context through [`JobEvent::Render`] and the worker blocks on the
//! reply; everything else it reports back as events tagged with its job id.

use std::sync::mpsc::{self, Sender};

use tracing::{debug, info};

use crate::api::Submitter;
use crate::error::{ErrorCode, InbetweenError, Result};
use crate::host::ReportLevel;
use crate::types::{JobRequest, JobResult};

use super::output::{create_unique_directory, OutputDirectory};
use super::CancelToken;

/// Message from a worker to the supervisor.
#[derive(Debug)]
pub(crate) enum JobEvent {
    Status {
        job_id: u64,
        level: ReportLevel,
        message: String,
    },
    Render {
        job_id: u64,
        frame: i32,
        reply: Sender<Result<Vec<u8>>>,
    },
    Finished {
        job_id: u64,
        outcome: Result<JobPayload>,
    },
}

impl JobEvent {
    pub(crate) fn job_id(&self) -> u64 {
        match self {
            JobEvent::Status { job_id, .. }
            | JobEvent::Render { job_id, .. }
            | JobEvent::Finished { job_id, .. } => *job_id,
        }
    }
}

/// A response ready to be applied to the timeline.
#[derive(Debug)]
pub(crate) struct JobPayload {
    pub result: JobResult,
    pub output_dir: OutputDirectory,
}

pub(crate) struct JobContext {
    job_id: u64,
    events: Sender<JobEvent>,
    cancel: CancelToken,
}

impl JobContext {
    pub(crate) fn new(job_id: u64, events: Sender<JobEvent>, cancel: CancelToken) -> Self {
        Self {
            job_id,
            events,
            cancel,
        }
    }

    fn status(&self, level: ReportLevel, message: String) {
        let _ = self.events.send(JobEvent::Status {
            job_id: self.job_id,
            level,
            message,
        });
    }

    fn checkpoint(&self, stage: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            debug!(job_id = self.job_id, stage, "Job observed cancellation");
            return Err(InbetweenError::cancelled(stage));
        }
        Ok(())
    }

    /// Asks the polling context to render `frame` and waits for the bytes.
    fn render(&self, frame: i32) -> Result<Vec<u8>> {
        self.checkpoint("before rendering")?;
        let (reply, response) = mpsc::channel();
        self.events
            .send(JobEvent::Render {
                job_id: self.job_id,
                frame,
                reply,
            })
            .map_err(|_| InbetweenError::cancelled("before rendering"))?;
        // The supervisor drops the reply sender for stale jobs.
        response
            .recv()
            .map_err(|_| InbetweenError::cancelled("while rendering"))?
    }
}

/// Thread body: render, submit, prepare the output directory, report back.
pub(crate) fn run_job<S: Submitter>(ctx: JobContext, request: JobRequest, submitter: S) {
    let outcome = execute(&ctx, &request, &submitter);
    match &outcome {
        Ok(payload) => info!(
            job_id = ctx.job_id,
            frames = payload.result.len(),
            "Inference finished"
        ),
        Err(e) if e.code == ErrorCode::Cancelled => {
            info!(job_id = ctx.job_id, "{}", e.message)
        }
        Err(e) => debug!(job_id = ctx.job_id, error = %e, "Job failed in background"),
    }
    let _ = ctx.events.send(JobEvent::Finished {
        job_id: ctx.job_id,
        outcome,
    });
}

fn execute<S: Submitter>(ctx: &JobContext, request: &JobRequest, submitter: &S) -> Result<JobPayload> {
    ctx.status(
        ReportLevel::Info,
        format!("Rendering start frame {}", request.start_frame),
    );
    let image1 = ctx.render(request.start_frame)?;
    ctx.status(
        ReportLevel::Info,
        format!("Rendering end frame {}", request.end_frame),
    );
    let image2 = ctx.render(request.end_frame)?;

    ctx.checkpoint("before submission")?;
    ctx.status(
        ReportLevel::Info,
        format!(
            "Sending frames to the {} model for in-betweening",
            request.endpoint.label()
        ),
    );
    let result = submitter.submit(&image1, &image2, request)?;
    ctx.checkpoint("after submission")?;

    ctx.status(
        ReportLevel::Info,
        format!(
            "Received {} in-between frames at {}x{}",
            result.len(),
            result.width,
            result.height
        ),
    );

    let output_dir = create_unique_directory(&request.output_dir);
    if let Some(reason) = &output_dir.fallback {
        ctx.status(
            ReportLevel::Warning,
            format!(
                "{}; writing frames to {}",
                reason.message,
                output_dir.path.display()
            ),
        );
    }

    Ok(JobPayload { result, output_dir })
}
