//! End-to-end tests copying directory trees with the local adapters

use porter::adapters::local;
use porter::adapters::metrics::LoggingMetricRecorder;
use porter::adapters::registry::AdapterRegistry;
use porter::adapters::store::{FileJobStore, JobStore};
use porter::adapters::traits::AuthData;
use porter::config::TransferConfig;
use porter::core::job::{JobOutcome, JobRunner};
use porter::core::retry::{RecordingClock, RetryStrategy, RetryStrategyLibrary};
use porter::domain::{DataVertical, FailureReason, JobState, TransferJob};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn source_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.jpg", "aaaa");
    write(dir.path(), "b.jpg", "bb");
    write(dir.path(), "c.jpg", "c");
    write(dir.path(), ".DS_Store", "ignored");
    write(dir.path(), "summer/d.jpg", "dddddd");
    write(dir.path(), "summer/beach/e.jpg", "eeeeeeeeee");
    dir
}

async fn run(
    source: &Path,
    destination: &Path,
    store: Arc<FileJobStore>,
    job: &TransferJob,
) -> JobOutcome {
    let mut registry = AdapterRegistry::new();
    local::register(&mut registry, source, destination);

    let transfer = TransferConfig {
        page_size: 2,
        ..TransferConfig::default()
    };
    JobRunner::new(
        Arc::new(registry),
        store,
        Arc::new(LoggingMetricRecorder::new()),
        Arc::new(RetryStrategyLibrary::uniform(RetryStrategy::NoRetry)),
        Arc::new(RecordingClock::new()),
        transfer,
    )
    .run(job.id, &AuthData::none(), &AuthData::none())
    .await
    .unwrap()
}

#[tokio::test]
async fn test_copies_nested_tree() {
    let source = source_tree();
    let destination = TempDir::new().unwrap();
    let jobs = TempDir::new().unwrap();
    let store = Arc::new(FileJobStore::open(jobs.path()).await.unwrap());

    let job = TransferJob::new(DataVertical::Photos, local::local_service(), local::local_service());
    store.create_job(&job).await.unwrap();

    let outcome = run(source.path(), destination.path(), store.clone(), &job).await;
    assert!(matches!(outcome, JobOutcome::Succeeded { .. }));

    let dest = destination.path();
    assert_eq!(fs::read_to_string(dest.join("a.jpg")).unwrap(), "aaaa");
    assert_eq!(fs::read_to_string(dest.join("c.jpg")).unwrap(), "c");
    assert_eq!(fs::read_to_string(dest.join("summer/d.jpg")).unwrap(), "dddddd");
    assert_eq!(
        fs::read_to_string(dest.join("summer/beach/e.jpg")).unwrap(),
        "eeeeeeeeee"
    );
    assert!(!dest.join(".DS_Store").exists());

    let progress = outcome.progress();
    assert_eq!(progress.counts.get("photos"), Some(&5));
    assert_eq!(progress.bytes, 4 + 2 + 1 + 6 + 10);

    // The state survives reopening the store
    let reopened = FileJobStore::open(jobs.path()).await.unwrap();
    let stored = reopened.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(stored.state, JobState::Complete);
    assert_eq!(reopened.job_progress(job.id).await.unwrap().bytes, 23);
}

#[tokio::test]
async fn test_missing_source_fails_the_job() {
    let destination = TempDir::new().unwrap();
    let jobs = TempDir::new().unwrap();
    let store = Arc::new(FileJobStore::open(jobs.path()).await.unwrap());

    let job = TransferJob::new(DataVertical::Videos, local::local_service(), local::local_service());
    store.create_job(&job).await.unwrap();

    let missing = destination.path().join("does-not-exist");
    let outcome = run(&missing, destination.path(), store.clone(), &job).await;

    assert!(matches!(
        outcome,
        JobOutcome::Failed {
            reason: FailureReason::RetriesExhausted,
            ..
        }
    ));
    assert_eq!(
        store.find_job(job.id).await.unwrap().unwrap().state,
        JobState::Error
    );
}

#[tokio::test]
async fn test_second_job_keeps_its_own_records() {
    let source = source_tree();
    let destination = TempDir::new().unwrap();
    let jobs = TempDir::new().unwrap();
    let store = Arc::new(FileJobStore::open(jobs.path()).await.unwrap());

    let job = TransferJob::new(DataVertical::Photos, local::local_service(), local::local_service());
    store.create_job(&job).await.unwrap();
    run(source.path(), destination.path(), store.clone(), &job).await;

    // A second job over the same trees copies again under its own records
    let second = TransferJob::new(DataVertical::Photos, local::local_service(), local::local_service());
    store.create_job(&second).await.unwrap();
    let outcome = run(source.path(), destination.path(), store.clone(), &second).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.progress().counts.get("photos"), Some(&5));
    assert_eq!(store.list_jobs().await.unwrap().len(), 2);
}
