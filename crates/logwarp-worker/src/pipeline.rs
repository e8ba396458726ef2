//! Per-job ingestion pipeline
//!
//! One run reads the job's log source front to back:
//!
//! ```text
//! LineSource -> RecordExtractor -> IndexResolver -> timestamp::normalize -> BatchAccumulator -> BulkWriter
//! ```
//!
//! Setup failures (pattern compile, source open) abort the run before any line is read.
//! Every other failure is reported on the output subject and the run continues. A status
//! event follows every flush, whatever its outcome.

use logwarp_common::types::{JobMessage, ParserKind};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::batch::BatchAccumulator;
use crate::bulk::BulkWriter;
use crate::context::WorkerContext;
use crate::error::PipelineError;
use crate::extract::{extractor_for, IndexResolver, RecordExtractor};
use crate::record::Record;
use crate::report::Reporter;
use crate::source::LineSource;
use crate::timestamp;

/// Running progress of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub id: String,
    /// Status of the most recent flush (0 when the store never answered)
    pub status: u16,
    /// Records attempted across all flushes
    pub records: u64,
}

impl JobStatus {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: 0,
            records: 0,
        }
    }

    pub fn record_flush(&mut self, status: u16, batch_len: usize) {
        self.status = status;
        self.records += batch_len as u64;
    }
}

/// Counters for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub lines: u64,
    pub records: u64,
    pub flushes: u64,
    pub errors: u64,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(JobSummary),
    Aborted(String),
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }
}

/// Run one job to completion or fatal failure
pub async fn run(ctx: Arc<WorkerContext>, job: JobMessage, kind: ParserKind) -> JobOutcome {
    let span = info_span!("job", job_id = %job.id, parser = %kind, log = %job.log);
    Pipeline::new(ctx, job).run(kind).instrument(span).await
}

struct Pipeline {
    ctx: Arc<WorkerContext>,
    job: JobMessage,
    reporter: Reporter,
    status: JobStatus,
    summary: JobSummary,
}

impl Pipeline {
    fn new(ctx: Arc<WorkerContext>, job: JobMessage) -> Self {
        let reporter = Reporter::new(ctx.bus.clone(), ctx.output_subject(), job.id.clone());
        let status = JobStatus::new(job.id.clone());

        Self {
            ctx,
            job,
            reporter,
            status,
            summary: JobSummary::default(),
        }
    }

    async fn run(mut self, kind: ParserKind) -> JobOutcome {
        info!("Job started");

        let extractor = match extractor_for(kind, &self.job.pattern) {
            Ok(extractor) => extractor,
            Err(e) => return self.abort(e).await,
        };

        let path = self.ctx.settings.logwarp.log_folder.join(&self.job.log);
        let mut source = match LineSource::open(&path).await {
            Ok(source) => source,
            Err(e) => {
                let err = PipelineError::SourceOpen {
                    path: path.display().to_string(),
                    source: e,
                };
                return self.abort(err).await;
            }
        };

        self.process(&mut source, extractor.as_ref()).await;

        info!(
            lines = self.summary.lines,
            records = self.summary.records,
            flushes = self.summary.flushes,
            errors = self.summary.errors,
            "Job completed"
        );
        JobOutcome::Completed(self.summary)
    }

    async fn process(&mut self, source: &mut LineSource, extractor: &dyn RecordExtractor) {
        let writer = BulkWriter::new(self.ctx.store.clone());
        let mut batch = BatchAccumulator::new(self.ctx.settings.opensearch.bulk_size);
        let mut resolver = IndexResolver::new(self.job.explicit_index());

        loop {
            let line = match source.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    let err = PipelineError::SourceRead {
                        line_number: source.line_number(),
                        source: e,
                    };
                    self.report(&err).await;
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            let line_number = source.line_number();
            self.summary.lines += 1;

            if let Some(record) = self.to_record(extractor, &mut resolver, line_number, &line).await {
                if batch.push(record) {
                    self.flush(&writer, &mut batch).await;
                }
            }
        }

        if !batch.is_empty() {
            self.flush(&writer, &mut batch).await;
        }
    }

    async fn to_record(
        &mut self,
        extractor: &dyn RecordExtractor,
        resolver: &mut IndexResolver,
        line_number: u64,
        line: &str,
    ) -> Option<Record> {
        let extracted = match extractor.extract(line) {
            Ok(extracted) => extracted,
            Err(reason) => {
                self.report(&PipelineError::parse(line_number, line, reason)).await;
                return None;
            }
        };

        let Some(index) = resolver.resolve(extracted.index.as_deref()) else {
            let err = PipelineError::parse(
                line_number,
                line,
                "no target index: the job names none and the line has no _index",
            );
            self.report(&err).await;
            return None;
        };

        let mut fields = extracted.fields;
        if extractor.normalizes_timestamp() {
            if let Err(source) = timestamp::normalize(&mut fields) {
                let err = PipelineError::Normalization {
                    line_number,
                    line: line.to_string(),
                    source,
                };
                self.report(&err).await;
            }
        }

        self.summary.records += 1;
        Some(Record {
            id: extracted.id,
            index,
            fields,
        })
    }

    async fn flush(&mut self, writer: &BulkWriter, batch: &mut BatchAccumulator) {
        let status = match writer.write(batch.records()).await {
            Ok(status) => status,
            Err(e) => {
                self.report(&e).await;
                e.response_status()
            }
        };

        self.status.record_flush(status, batch.len());
        self.summary.flushes += 1;
        debug!(status, records = self.status.records, "Batch flushed");

        self.reporter.status(self.status.status, self.status.records).await;
        batch.clear();
    }

    async fn report(&mut self, err: &PipelineError) {
        self.summary.errors += 1;
        self.reporter.error(err).await;
    }

    async fn abort(self, err: PipelineError) -> JobOutcome {
        warn!(class = err.class().as_str(), "Job aborted");
        self.reporter.error(&err).await;
        JobOutcome::Aborted(err.to_string())
    }
}
