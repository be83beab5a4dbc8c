//! Integration tests for the job lifecycle
//!
//! These tests verify that:
//! - Jobs end in the state matching their copy outcome
//! - Item errors are attached to the job
//! - Unsupported service pairs fail the job without copying
//! - Failed jobs resume and finished jobs are refused

mod common;

use common::{default_library, items, service, RecordingImporter, ScriptedExporter};
use porter::adapters::metrics::LoggingMetricRecorder;
use porter::adapters::registry::AdapterRegistry;
use porter::adapters::store::{InMemoryJobStore, JobStore};
use porter::adapters::traits::{AuthData, Exporter, Importer};
use porter::config::TransferConfig;
use porter::core::job::{JobOutcome, JobRunner};
use porter::core::retry::{RecordingClock, RetryStrategy, RetryStrategyLibrary};
use porter::domain::{
    ContinuationData, ContinuationToken, DataVertical, ErrorDetail, ExportResult, FailureReason,
    ItemCounts, JobState, TransferError, TransferJob,
};
use std::sync::Arc;
use tokio::sync::watch;

fn registry(exporter: Arc<ScriptedExporter>, importer: Arc<RecordingImporter>) -> Arc<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();
    registry.register_exporter(service("source"), DataVertical::Photos, move |_| {
        Ok(exporter.clone() as Arc<dyn Exporter>)
    });
    registry.register_importer(service("destination"), DataVertical::Photos, move |_| {
        Ok(importer.clone() as Arc<dyn Importer>)
    });
    Arc::new(registry)
}

fn runner(
    registry: Arc<AdapterRegistry>,
    store: Arc<InMemoryJobStore>,
    library: Arc<RetryStrategyLibrary>,
) -> JobRunner {
    JobRunner::new(
        registry,
        store,
        Arc::new(LoggingMetricRecorder::new()),
        library,
        Arc::new(RecordingClock::new()),
        TransferConfig::default(),
    )
}

async fn stored_job(store: &InMemoryJobStore, data_type: DataVertical) -> TransferJob {
    let job = TransferJob::new(data_type, service("source"), service("destination"));
    store.create_job(&job).await.unwrap();
    job
}

fn two_pages() -> Arc<ScriptedExporter> {
    Arc::new(
        ScriptedExporter::new()
            .on(
                "root/start",
                Ok(ExportResult::continuing(
                    Some(items("photos", &["p1", "p2"])),
                    ContinuationData::next(ContinuationToken::Offset(2)),
                )),
            )
            .on("root/2", Ok(ExportResult::end(Some(items("photos", &["p3"]))))),
    )
}

#[tokio::test]
async fn test_successful_job_is_complete() {
    let store = Arc::new(InMemoryJobStore::new());
    let job = stored_job(&store, DataVertical::Photos).await;

    let outcome = runner(
        registry(two_pages(), Arc::new(RecordingImporter::new())),
        store.clone(),
        default_library(),
    )
    .run(job.id, &AuthData::none(), &AuthData::none())
    .await
    .unwrap();

    assert!(matches!(outcome, JobOutcome::Succeeded { .. }));
    assert_eq!(
        outcome.progress().counts,
        ItemCounts::from([("photos".to_string(), 3)])
    );
    let job = store.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Complete);
}

#[tokio::test]
async fn test_item_errors_are_attached_to_the_job() {
    let store = Arc::new(InMemoryJobStore::new());
    let job = stored_job(&store, DataVertical::Photos).await;
    let importer = Arc::new(
        RecordingImporter::new().failing_item("p2", TransferError::Io("connection reset".into())),
    );

    let outcome = runner(registry(two_pages(), importer), store.clone(), default_library())
        .run(job.id, &AuthData::none(), &AuthData::none())
        .await
        .unwrap();

    assert!(outcome.is_success());
    match &outcome {
        JobOutcome::SucceededWithSkippedItems { progress } => {
            assert_eq!(progress.errors.len(), 1);
            assert_eq!(progress.errors[0].id, "p2");
            assert!(progress.errors[0].can_skip);
            assert_eq!(progress.total_items(), 2);
        }
        other => panic!("expected skipped items, got {other:?}"),
    }
    assert_eq!(
        store.find_job(job.id).await.unwrap().unwrap().state,
        JobState::Complete
    );
}

#[tokio::test]
async fn test_leftover_unskippable_error_still_reports_skipped_items() {
    let store = Arc::new(InMemoryJobStore::new());
    let job = stored_job(&store, DataVertical::Photos).await;
    let earlier = ErrorDetail::new(
        "p9",
        "p9",
        &TransferError::DestinationFull("storage quota exceeded".into()),
    );
    store
        .create_data(job.id, "error:p9", serde_json::to_value(&earlier).unwrap())
        .await
        .unwrap();

    let outcome = runner(
        registry(two_pages(), Arc::new(RecordingImporter::new())),
        store.clone(),
        default_library(),
    )
    .run(job.id, &AuthData::none(), &AuthData::none())
    .await
    .unwrap();

    match &outcome {
        JobOutcome::SucceededWithSkippedItems { progress } => {
            assert_eq!(progress.errors.len(), 1);
            assert_eq!(progress.errors[0].id, "p9");
            assert!(!progress.errors[0].can_skip);
            assert_eq!(progress.total_items(), 3);
        }
        other => panic!("expected skipped items, got {other:?}"),
    }
    assert_eq!(
        store.find_job(job.id).await.unwrap().unwrap().state,
        JobState::Complete
    );
}

#[tokio::test]
async fn test_fatal_error_fails_the_job() {
    let store = Arc::new(InMemoryJobStore::new());
    let job = stored_job(&store, DataVertical::Photos).await;
    let importer = Arc::new(
        RecordingImporter::new()
            .failing_with(vec![TransferError::DestinationFull("storage quota exceeded".into())]),
    );

    let outcome = runner(registry(two_pages(), importer), store.clone(), default_library())
        .run(job.id, &AuthData::none(), &AuthData::none())
        .await
        .unwrap();

    match outcome {
        JobOutcome::Failed { reason, message, .. } => {
            assert_eq!(reason, FailureReason::DestinationFull);
            assert!(message.contains("storage quota exceeded"));
        }
        other => panic!("expected a failed job, got {other:?}"),
    }
    let job = store.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Error);
    assert_eq!(job.failure_reason, Some(FailureReason::DestinationFull));
}

#[tokio::test]
async fn test_unsupported_pair_fails_without_copying() {
    let store = Arc::new(InMemoryJobStore::new());
    let job = stored_job(&store, DataVertical::Mail).await;
    let exporter = two_pages();

    let outcome = runner(
        registry(exporter.clone(), Arc::new(RecordingImporter::new())),
        store.clone(),
        default_library(),
    )
    .run(job.id, &AuthData::none(), &AuthData::none())
    .await
    .unwrap();

    assert!(matches!(
        outcome,
        JobOutcome::Failed {
            reason: FailureReason::Unsupported,
            ..
        }
    ));
    assert!(exporter.calls().is_empty());
    assert_eq!(
        store.find_job(job.id).await.unwrap().unwrap().state,
        JobState::Error
    );
}

#[tokio::test]
async fn test_failed_job_resumes_and_finished_job_is_refused() {
    let store = Arc::new(InMemoryJobStore::new());
    let job = stored_job(&store, DataVertical::Photos).await;
    let no_retry = Arc::new(RetryStrategyLibrary::uniform(RetryStrategy::NoRetry));

    let flaky = Arc::new(
        ScriptedExporter::new()
            .on(
                "root/start",
                Ok(ExportResult::continuing(
                    Some(items("photos", &["p1", "p2"])),
                    ContinuationData::next(ContinuationToken::Offset(2)),
                )),
            )
            .on("root/2", Err(TransferError::Transient("502".into()))),
    );
    let first = runner(
        registry(flaky, Arc::new(RecordingImporter::new())),
        store.clone(),
        no_retry.clone(),
    )
    .run(job.id, &AuthData::none(), &AuthData::none())
    .await
    .unwrap();
    assert!(matches!(
        first,
        JobOutcome::Failed {
            reason: FailureReason::RetriesExhausted,
            ..
        }
    ));

    let recovered = Arc::new(
        ScriptedExporter::new().on("root/2", Ok(ExportResult::end(Some(items("photos", &["p3"]))))),
    );
    let importer = Arc::new(RecordingImporter::new());
    let second = runner(registry(recovered.clone(), importer.clone()), store.clone(), no_retry.clone())
        .run(job.id, &AuthData::none(), &AuthData::none())
        .await
        .unwrap();

    assert!(matches!(second, JobOutcome::Succeeded { .. }));
    assert_eq!(recovered.calls(), vec!["root/2"]);
    assert_eq!(importer.created(), vec!["p3"]);
    assert_eq!(second.progress().total_items(), 3);

    let refused = runner(registry(two_pages(), importer), store, no_retry)
        .run(job.id, &AuthData::none(), &AuthData::none())
        .await;
    assert!(matches!(refused, Err(TransferError::Configuration(_))));
}

#[tokio::test]
async fn test_shutdown_cancels_the_job() {
    let store = Arc::new(InMemoryJobStore::new());
    let job = stored_job(&store, DataVertical::Photos).await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send(true).unwrap();

    let outcome = runner(
        registry(two_pages(), Arc::new(RecordingImporter::new())),
        store.clone(),
        default_library(),
    )
    .with_shutdown(shutdown_rx)
    .run(job.id, &AuthData::none(), &AuthData::none())
    .await
    .unwrap();

    assert!(matches!(outcome, JobOutcome::Cancelled { .. }));
    assert_eq!(
        store.find_job(job.id).await.unwrap().unwrap().state,
        JobState::Canceled
    );
}

#[tokio::test]
async fn test_missing_job_is_an_error() {
    let store = Arc::new(InMemoryJobStore::new());
    let result = runner(
        registry(two_pages(), Arc::new(RecordingImporter::new())),
        store,
        default_library(),
    )
    .run(porter::domain::JobId::new(), &AuthData::none(), &AuthData::none())
    .await;
    assert!(matches!(result, Err(TransferError::NotFound(_))));
}
