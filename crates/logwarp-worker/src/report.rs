//! Status and error reporting
//!
//! Every call publishes exactly one event on the output subject. Publishing never fails
//! the job: encode and publish failures are logged and dropped.

use logwarp_common::types::{JobErrorEvent, JobStatusEvent, OutputEvent};
use std::sync::Arc;
use tracing::{error, warn};

use crate::bus::EventBus;
use crate::error::PipelineError;

/// Publishes events for one job
#[derive(Clone)]
pub struct Reporter {
    bus: Arc<dyn EventBus>,
    subject: String,
    job_id: String,
}

impl Reporter {
    pub fn new(bus: Arc<dyn EventBus>, subject: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            bus,
            subject: subject.into(),
            job_id: job_id.into(),
        }
    }

    pub async fn status(&self, status: u16, records: u64) {
        let event = JobStatusEvent {
            id: self.job_id.clone(),
            status,
            records,
        };
        self.publish(event.into()).await;
    }

    pub async fn error(&self, err: &PipelineError) {
        error!(job_id = %self.job_id, class = err.class().as_str(), "{err}");

        let event = JobErrorEvent {
            id: self.job_id.clone(),
            error: err.to_string(),
        };
        self.publish(event.into()).await;
    }

    async fn publish(&self, event: OutputEvent) {
        let payload = match event.to_vec() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(job_id = %self.job_id, error = %e, "Failed to encode output event");
                return;
            }
        };

        if let Err(e) = self.bus.publish(&self.subject, payload).await {
            warn!(job_id = %self.job_id, error = %e, "Failed to publish output event");
        }
    }
}
