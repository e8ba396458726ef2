//! Pipeline behaviour against in-memory bus and store doubles

mod helpers;

use helpers::{access_log, MockStore, TestWorker, OUTPUT_SUBJECT};
use logwarp_common::types::{JobMessage, ParserKind};
use logwarp_worker::pipeline::{self, JobOutcome};
use serde_json::json;

fn grok_job(log: &str) -> JobMessage {
    JobMessage {
        id: "job-1".into(),
        index: "weblogs".into(),
        log: log.into(),
        pattern: "%{COMMONAPACHELOG}".into(),
        parser: "grok".into(),
    }
}

fn elastic_job(log: &str, index: &str) -> JobMessage {
    JobMessage {
        id: "job-2".into(),
        index: index.into(),
        log: log.into(),
        pattern: String::new(),
        parser: "elastic".into(),
    }
}

#[tokio::test]
async fn test_batches_split_at_capacity() {
    let worker = TestWorker::new(4);
    worker.write_log("access.log", &access_log(10));

    let outcome = pipeline::run(worker.ctx.clone(), grok_job("access.log"), ParserKind::Grok).await;

    let summary = match outcome {
        JobOutcome::Completed(summary) => summary,
        other => panic!("job did not complete: {other:?}"),
    };
    assert_eq!(summary.records, 10);
    assert_eq!(summary.flushes, 3);
    assert_eq!(worker.store.batch_sizes(), [4, 4, 2]);

    let statuses = worker.bus.statuses();
    let counts: Vec<_> = statuses.iter().map(|s| s.records).collect();
    assert_eq!(counts, [4, 8, 10]);
    assert!(statuses.iter().all(|s| s.status == 200 && s.id == "job-1"));
    assert!(worker.bus.errors().is_empty());
    assert!(worker.bus.subjects().iter().all(|s| s == OUTPUT_SUBJECT));
}

#[tokio::test]
async fn test_exact_multiple_of_capacity() {
    let worker = TestWorker::new(5);
    worker.write_log("access.log", &access_log(10));

    pipeline::run(worker.ctx.clone(), grok_job("access.log"), ParserKind::Grok).await;

    assert_eq!(worker.store.batch_sizes(), [5, 5]);
}

#[tokio::test]
async fn test_grok_records_are_typed_and_normalized() {
    let worker = TestWorker::new(100);
    worker.write_log("access.log", &access_log(2));

    pipeline::run(worker.ctx.clone(), grok_job("access.log"), ParserKind::Grok).await;

    let documents = worker.store.documents();
    assert_eq!(documents[0]["timestamp"], json!("2023-10-10T20:55:36Z"));
    assert_eq!(documents[0]["response"], json!(200));
    assert_eq!(documents[1]["bytes"], json!(101));
    assert_eq!(documents[1]["request"], json!("/item/1"));

    let actions = worker.store.actions();
    assert_eq!(actions[0]["index"]["_index"], json!("weblogs"));
    assert_ne!(actions[0]["index"]["_id"], actions[1]["index"]["_id"]);
}

#[tokio::test]
async fn test_malformed_line_is_reported_and_skipped() {
    let worker = TestWorker::new(100);
    let mut log = access_log(3);
    log.push_str("this is not an access log line\n");
    log.push_str(&access_log(2));
    worker.write_log("access.log", &log);

    pipeline::run(worker.ctx.clone(), grok_job("access.log"), ParserKind::Grok).await;

    let errors = worker.bus.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].error.contains("this is not an access log line"));
    assert!(errors[0].error.starts_with("Unable to parse line 4"));
    assert_eq!(worker.store.documents().len(), 5);
}

#[tokio::test]
async fn test_missing_timestamp_keeps_record() {
    let worker = TestWorker::new(100);
    worker.write_log("app.log", "INFO cache warmed\nWARN disk slow\n");

    let job = JobMessage {
        pattern: "%{LOGLEVEL:level} %{GREEDYDATA:message}".into(),
        ..grok_job("app.log")
    };
    pipeline::run(worker.ctx.clone(), job, ParserKind::Grok).await;

    let errors = worker.bus.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].error.starts_with("Missing or invalid timestamp in line 1"));

    let documents = worker.store.documents();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0], json!({"level": "INFO", "message": "cache warmed"}));
}

#[tokio::test]
async fn test_unroutable_line_reports_one_error() {
    let worker = TestWorker::new(100);
    worker.write_log("app.log", "INFO cache warmed\nWARN disk slow\n");

    let job = JobMessage {
        index: String::new(),
        pattern: "%{LOGLEVEL:level} %{GREEDYDATA:message}".into(),
        ..grok_job("app.log")
    };
    let outcome = pipeline::run(worker.ctx.clone(), job, ParserKind::Grok).await;
    assert!(outcome.is_completed());

    let errors = worker.bus.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].error.starts_with("Unable to parse line 1"));
    assert!(errors[1].error.starts_with("Unable to parse line 2"));
    assert!(errors.iter().all(|e| !e.error.contains("timestamp")));
    assert!(worker.store.payloads().is_empty());
}

#[tokio::test]
async fn test_failed_batch_does_not_stop_job() {
    let worker = TestWorker::with_store(2, MockStore::scripted(&[200, 503, 200]));
    worker.write_log("access.log", &access_log(6));

    let outcome = pipeline::run(worker.ctx.clone(), grok_job("access.log"), ParserKind::Grok).await;
    assert!(outcome.is_completed());

    let errors = worker.bus.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error, "Bulk insert failed: bulk request failed with status: 503");

    assert_eq!(worker.store.batch_sizes(), [2, 2, 2]);
    let statuses: Vec<_> = worker
        .bus
        .statuses()
        .iter()
        .map(|s| (s.status, s.records))
        .collect();
    assert_eq!(statuses, [(200, 2), (503, 4), (200, 6)]);
}

#[tokio::test]
async fn test_compile_failure_aborts_before_reading() {
    let worker = TestWorker::new(10);
    worker.write_log("access.log", &access_log(3));

    let job = JobMessage {
        pattern: "%{NOT_A_PATTERN:x}".into(),
        ..grok_job("access.log")
    };
    let outcome = pipeline::run(worker.ctx.clone(), job, ParserKind::Grok).await;

    assert!(matches!(outcome, JobOutcome::Aborted(_)));
    assert_eq!(worker.bus.errors().len(), 1);
    assert!(worker.bus.statuses().is_empty());
    assert!(worker.store.payloads().is_empty());
}

#[tokio::test]
async fn test_empty_source_publishes_nothing() {
    let worker = TestWorker::new(10);
    worker.write_log("empty.log", "\n\n");

    let outcome = pipeline::run(worker.ctx.clone(), grok_job("empty.log"), ParserKind::Grok).await;

    assert_eq!(outcome, JobOutcome::Completed(Default::default()));
    assert!(worker.bus.events().is_empty());
    assert!(worker.store.payloads().is_empty());
}

#[tokio::test]
async fn test_elastic_pins_first_embedded_index() {
    let worker = TestWorker::new(10);
    worker.write_log(
        "export.ndjson",
        concat!(
            r#"{"_id":"a","_index":"first","_source":{"msg":"one","timestamp":"not normalized"}}"#,
            "\n",
            r#"{"_id":"b","_index":"second","_source":{"msg":"two"}}"#,
            "\n",
            "{broken\n",
        ),
    );

    pipeline::run(worker.ctx.clone(), elastic_job("export.ndjson", ""), ParserKind::Elastic).await;

    let actions = worker.store.actions();
    assert_eq!(
        actions,
        [
            json!({"index": {"_id": "a", "_index": "first"}}),
            json!({"index": {"_id": "b", "_index": "first"}}),
        ]
    );
    assert_eq!(worker.store.documents()[0]["timestamp"], json!("not normalized"));

    let errors = worker.bus.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].error.contains("{broken"));
}

#[tokio::test]
async fn test_elastic_explicit_index_wins() {
    let worker = TestWorker::new(10);
    worker.write_log(
        "export.ndjson",
        r#"{"_id":"a","_index":"embedded","_source":{"msg":"one"}}"#,
    );

    pipeline::run(worker.ctx.clone(), elastic_job("export.ndjson", "override"), ParserKind::Elastic).await;

    assert_eq!(worker.store.actions()[0]["index"]["_index"], json!("override"));
    assert_eq!(worker.bus.statuses().len(), 1);
}
