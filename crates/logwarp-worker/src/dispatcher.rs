//! Job intake
//!
//! The dispatcher validates each command and spawns one pipeline task per accepted job.
//! It never awaits a pipeline, so a slow job cannot hold up intake.

use futures::{Stream, StreamExt};
use logwarp_common::types::JobMessage;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::context::WorkerContext;
use crate::error::PipelineError;
use crate::pipeline::{self, JobOutcome};
use crate::report::Reporter;
use crate::source::log_file_exists;

/// Handle to a spawned pipeline
#[derive(Debug)]
pub struct JobHandle {
    pub job_id: String,
    handle: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub async fn wait(self) -> Result<JobOutcome, JoinError> {
        self.handle.await
    }
}

/// What happened to one command
#[derive(Debug)]
pub enum Dispatch {
    Started(JobHandle),
    /// Payload was not a job command
    Invalid,
    /// Source could not be found; one error event was published
    SourceMissing,
    /// Parser selector not recognized; nothing was published
    UnknownParser,
}

/// Validates commands and starts pipelines
#[derive(Clone)]
pub struct JobDispatcher {
    ctx: Arc<WorkerContext>,
    limiter: Option<Arc<Semaphore>>,
}

impl JobDispatcher {
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        let limiter = ctx
            .settings
            .job_limit()
            .map(|limit| Arc::new(Semaphore::new(limit)));

        Self { ctx, limiter }
    }

    /// Handle one command payload
    pub async fn dispatch(&self, payload: &[u8]) -> Dispatch {
        let job = match JobMessage::from_slice(payload) {
            Ok(job) => job,
            Err(e) => {
                error!(error = %e, "Unable to decode job message");
                return Dispatch::Invalid;
            }
        };

        info!(job_id = %job.id, log = %job.log, parser = %job.parser, "Received job");

        let root = &self.ctx.settings.logwarp.log_folder;
        let missing = match log_file_exists(root, &job.log).await {
            Ok(true) => None,
            Ok(false) => Some(PipelineError::SourceMissing(job.log.clone())),
            Err(source) => Some(PipelineError::SourceListing {
                folder: root.display().to_string(),
                source,
            }),
        };

        if let Some(err) = missing {
            Reporter::new(self.ctx.bus.clone(), self.ctx.output_subject(), job.id.clone())
                .error(&err)
                .await;
            return Dispatch::SourceMissing;
        }

        let Some(kind) = job.parser_kind() else {
            warn!(job_id = %job.id, parser = %job.parser, "Unknown parser, job ignored");
            return Dispatch::UnknownParser;
        };

        let job_id = job.id.clone();
        let ctx = self.ctx.clone();
        let limiter = self.limiter.clone();

        let handle = tokio::spawn(async move {
            // Held until the pipeline returns
            let _permit = match limiter {
                Some(limiter) => match limiter.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return JobOutcome::Aborted("job limiter closed".to_string()),
                },
                None => None,
            };
            pipeline::run(ctx, job, kind).await
        });

        Dispatch::Started(JobHandle { job_id, handle })
    }

    /// Dispatch every payload from `commands` until the stream ends
    pub async fn listen<S, B>(&self, mut commands: S)
    where
        S: Stream<Item = B> + Unpin,
        B: AsRef<[u8]>,
    {
        info!(subject = %self.ctx.settings.nats.command_subject, "Listening for jobs");

        while let Some(payload) = commands.next().await {
            if let Dispatch::Started(handle) = self.dispatch(payload.as_ref()).await {
                debug!(job_id = %handle.job_id, "Job dispatched");
            }
        }

        info!("Command stream closed");
    }
}
