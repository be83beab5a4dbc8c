//! Integration tests for the idempotent import executor
//!
//! These tests verify that:
//! - A side effect runs once per key, however often the page is retried
//! - A restarted executor sees results and errors written before the restart
//! - Results of one job never leak into another
//! - A later success clears the recorded error for that key

mod common;

use common::job;
use porter::adapters::store::{FileJobStore, JobStore};
use porter::core::idempotent::{IdempotentImportExecutor, Lookup};
use porter::domain::{DataVertical, TransferError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

async fn file_store(dir: &TempDir) -> Arc<FileJobStore> {
    Arc::new(FileJobStore::open(dir.path()).await.unwrap())
}

#[tokio::test]
async fn test_side_effect_runs_once_across_retries() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let job = job(DataVertical::Photos);
    store.create_job(&job).await.unwrap();

    let executor = IdempotentImportExecutor::new(store.clone());
    executor.bind_job(job.id).await.unwrap();

    let calls = AtomicUsize::new(0);
    for _ in 0..3 {
        let id: String = executor
            .execute_or_throw("album-1", "Summer", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("remote-42".to_string())
            })
            .await
            .unwrap();
        assert_eq!(id, "remote-42");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(executor.is_key_cached("album-1"));
    assert_eq!(
        executor.get_cached_value::<String>("album-1").unwrap(),
        "remote-42"
    );
}

#[tokio::test]
async fn test_restart_rehydrates_results_and_errors() {
    let dir = TempDir::new().unwrap();
    let job = job(DataVertical::Photos);
    {
        let store = file_store(&dir).await;
        store.create_job(&job).await.unwrap();
        let executor = IdempotentImportExecutor::new(store);
        executor.bind_job(job.id).await.unwrap();

        executor
            .execute_or_throw("album-1", "Summer", || async { Ok(7u64) })
            .await
            .unwrap();
        let swallowed: Option<u64> = executor
            .execute_and_swallow_io_errors("photo-9", "beach.jpg", || async {
                Err(TransferError::Io("connection reset".into()))
            })
            .await
            .unwrap();
        assert!(swallowed.is_none());
    }

    // Reopen the store as a new worker would
    let store = file_store(&dir).await;
    let executor = IdempotentImportExecutor::new(store);
    executor.bind_job(job.id).await.unwrap();

    let calls = AtomicUsize::new(0);
    let value: u64 = executor
        .execute_or_throw("album-1", "Summer", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(99u64)
        })
        .await
        .unwrap();
    assert_eq!(value, 7);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    match executor.lookup::<u64>("photo-9").unwrap() {
        Lookup::Failed(detail) => {
            assert_eq!(detail.title, "beach.jpg");
            assert!(detail.can_skip);
        }
        other => panic!("expected a recorded failure, got {other:?}"),
    }
    assert!(matches!(
        executor.lookup::<u64>("never-seen").unwrap(),
        Lookup::Absent
    ));
}

#[tokio::test]
async fn test_results_are_isolated_per_job() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let first = job(DataVertical::Photos);
    let second = job(DataVertical::Photos);
    store.create_job(&first).await.unwrap();
    store.create_job(&second).await.unwrap();

    let executor = IdempotentImportExecutor::new(store.clone());
    executor.bind_job(first.id).await.unwrap();
    executor
        .execute_or_throw("album-1", "Summer", || async { Ok("first".to_string()) })
        .await
        .unwrap();

    let other = IdempotentImportExecutor::new(store);
    other.bind_job(second.id).await.unwrap();
    assert!(!other.is_key_cached("album-1"));
    assert!(matches!(
        other.get_cached_value::<String>("album-1"),
        Err(TransferError::NotFound(_))
    ));

    let value: String = other
        .execute_or_throw("album-1", "Summer", || async { Ok("second".to_string()) })
        .await
        .unwrap();
    assert_eq!(value, "second");
}

#[tokio::test]
async fn test_success_clears_recorded_error() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let job = job(DataVertical::Photos);
    store.create_job(&job).await.unwrap();

    let executor = IdempotentImportExecutor::new(store.clone());
    executor.bind_job(job.id).await.unwrap();

    let failed: Result<String, _> = executor
        .execute_or_throw("photo-1", "cat.jpg", || async {
            Err(TransferError::Item("thumbnail failed".into()))
        })
        .await;
    assert!(failed.is_err());
    assert_eq!(executor.errors().len(), 1);
    assert_eq!(store.job_progress(job.id).await.unwrap().errors.len(), 1);

    executor
        .execute_or_throw("photo-1", "cat.jpg", || async { Ok("remote-1".to_string()) })
        .await
        .unwrap();

    assert!(executor.errors().is_empty());
    assert!(store.job_progress(job.id).await.unwrap().errors.is_empty());

    // Still cleared after a restart
    let restarted = IdempotentImportExecutor::new(store);
    restarted.bind_job(job.id).await.unwrap();
    assert!(restarted.errors().is_empty());
}

#[tokio::test]
async fn test_fatal_error_is_recorded_and_propagated() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let job = job(DataVertical::Photos);
    store.create_job(&job).await.unwrap();

    let executor = IdempotentImportExecutor::new(store);
    executor.bind_job(job.id).await.unwrap();

    let err = executor
        .execute_and_swallow_io_errors::<String, _, _>("album-1", "Summer", || async {
            Err(TransferError::DestinationFull("quota".into()))
        })
        .await
        .unwrap_err();
    assert!(err.is_fatal());

    let errors = executor.errors();
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].can_skip);
}
