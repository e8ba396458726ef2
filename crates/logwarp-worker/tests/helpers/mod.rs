//! Test helpers for worker integration tests
//!
//! In-memory bus and store doubles, a log-folder fixture and a context builder.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use logwarp_common::types::{JobErrorEvent, JobStatusEvent, OutputEvent};
use logwarp_worker::{
    bus::{BusError, EventBus},
    context::WorkerContext,
    settings::Settings,
    store::{BulkResponse, DocumentStore, StoreError},
};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const OUTPUT_SUBJECT: &str = "logwarp/output";

pub const OK_BODY: &str = r#"{"took":1,"errors":false,"items":[]}"#;

/// Records every publish
#[derive(Default)]
pub struct RecordingBus {
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingBus {
    pub fn events(&self) -> Vec<OutputEvent> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| serde_json::from_slice(payload).unwrap())
            .collect()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(subject, _)| subject.clone())
            .collect()
    }

    pub fn statuses(&self) -> Vec<JobStatusEvent> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OutputEvent::Status(status) => Some(status),
                OutputEvent::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<JobErrorEvent> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                OutputEvent::Error(error) => Some(error),
                OutputEvent::Status(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl EventBus for RecordingBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.published
            .lock()
            .unwrap()
            .push((subject.to_string(), payload));
        Ok(())
    }
}

/// Answers bulk calls from a script, then with 200 once the script runs out
#[derive(Default)]
pub struct MockStore {
    script: Mutex<VecDeque<u16>>,
    payloads: Mutex<Vec<String>>,
}

impl MockStore {
    pub fn scripted(statuses: &[u16]) -> Self {
        Self {
            script: Mutex::new(statuses.iter().copied().collect()),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }

    /// Number of records in each bulk call
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.payloads()
            .iter()
            .map(|payload| payload.lines().count() / 2)
            .collect()
    }

    /// Source documents across all bulk calls, in order
    pub fn documents(&self) -> Vec<serde_json::Value> {
        self.payloads()
            .iter()
            .flat_map(|payload| {
                payload
                    .lines()
                    .skip(1)
                    .step_by(2)
                    .map(|line| serde_json::from_str(line).unwrap())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Action lines across all bulk calls, in order
    pub fn actions(&self) -> Vec<serde_json::Value> {
        self.payloads()
            .iter()
            .flat_map(|payload| {
                payload
                    .lines()
                    .step_by(2)
                    .map(|line| serde_json::from_str(line).unwrap())
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn bulk(&self, payload: String) -> Result<BulkResponse, StoreError> {
        self.payloads.lock().unwrap().push(payload);
        let status = self.script.lock().unwrap().pop_front().unwrap_or(200);
        let body = if status == 200 { OK_BODY } else { r#"{"error":"rejected"}"# };

        Ok(BulkResponse {
            status,
            body: body.to_string(),
        })
    }
}

/// Temporary log folder plus context wired to the doubles
pub struct TestWorker {
    pub dir: TempDir,
    pub bus: Arc<RecordingBus>,
    pub store: Arc<MockStore>,
    pub ctx: Arc<WorkerContext>,
}

impl TestWorker {
    pub fn new(bulk_size: usize) -> Self {
        Self::with_store(bulk_size, MockStore::default())
    }

    pub fn with_store(bulk_size: usize, store: MockStore) -> Self {
        let dir = TempDir::new().expect("Failed to create log folder");
        let bus = Arc::new(RecordingBus::default());
        let store = Arc::new(store);

        let mut settings = Settings::default();
        settings.opensearch.bulk_size = bulk_size;
        settings.nats.output_subject = OUTPUT_SUBJECT.to_string();
        settings.logwarp.log_folder = dir.path().to_path_buf();

        let ctx = Arc::new(WorkerContext::new(settings, bus.clone(), store.clone()));

        Self {
            dir,
            bus,
            store,
            ctx,
        }
    }

    pub fn write_log(&self, name: &str, contents: &str) {
        std::fs::write(self.dir.path().join(name), contents).expect("Failed to write log");
    }

    pub fn folder(&self) -> &Path {
        self.dir.path()
    }
}

/// `count` combined-log lines with distinct byte counts
pub fn access_log(count: usize) -> String {
    (0..count)
        .map(|i| {
            format!(
                "10.0.0.{} - - [10/Oct/2023:13:55:36 -0700] \"GET /item/{i} HTTP/1.1\" 200 {}\n",
                i % 250,
                100 + i
            )
        })
        .collect()
}
