//! Bulk encoding and submission

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::record::Record;
use crate::store::DocumentStore;

/// Render records as a bulk body: action line then source line per record, newline terminated
pub fn encode_bulk(records: &[Record]) -> PipelineResult<String> {
    let mut body = String::new();

    for record in records {
        let serialization = |source| PipelineError::Serialization {
            id: record.id.clone(),
            source,
        };
        let action = serde_json::to_string(&record.action()).map_err(serialization)?;
        let fields = serde_json::to_string(&record.fields).map_err(serialization)?;

        body.push_str(&action);
        body.push('\n');
        body.push_str(&fields);
        body.push('\n');
    }

    Ok(body)
}

#[derive(Debug, Deserialize)]
struct BulkSummary {
    #[serde(default)]
    errors: bool,
}

/// Submits batches to a [`DocumentStore`] and interprets the response
#[derive(Clone)]
pub struct BulkWriter {
    store: Arc<dyn DocumentStore>,
}

impl BulkWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Write one batch and return the response status
    ///
    /// Transport failures, non-200 responses and undecodable bodies are write errors.
    /// Item-level failures inside a 200 response are only logged.
    pub async fn write(&self, records: &[Record]) -> PipelineResult<u16> {
        let payload = encode_bulk(records)?;

        let response = self.store.bulk(payload).await.map_err(|e| PipelineError::Write {
            status: None,
            reason: e.to_string(),
        })?;

        if response.status != 200 {
            return Err(PipelineError::Write {
                status: Some(response.status),
                reason: format!("bulk request failed with status: {}", response.status),
            });
        }

        let summary: BulkSummary =
            serde_json::from_str(&response.body).map_err(|e| PipelineError::Write {
                status: Some(response.status),
                reason: format!("failed to parse bulk response: {e}"),
            })?;

        if summary.errors {
            warn!(
                records = records.len(),
                "Bulk response reported item-level errors"
            );
        }

        debug!(status = response.status, records = records.len(), "Bulk batch indexed");
        Ok(response.status)
    }
}
