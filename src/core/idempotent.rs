//! Idempotent import executor
//!
//! Guarantees that each logical import side effect (create this album,
//! upload this photo) happens at most once per job. Successful results are
//! cached under their idempotent id and persisted in the job store as
//! `result:<id>` records; failures are persisted as `error:<id>` records.
//! Binding the executor to a job reloads both, so a restarted worker skips
//! work that already succeeded.
//!
//! # Example
//!
//! ```rust,no_run
//! use porter::adapters::store::InMemoryJobStore;
//! use porter::core::idempotent::IdempotentImportExecutor;
//! use porter::domain::JobId;
//! use std::sync::Arc;
//!
//! # async fn example() -> porter::domain::Result<()> {
//! let executor = IdempotentImportExecutor::new(Arc::new(InMemoryJobStore::new()));
//! executor.bind_job(JobId::new()).await?;
//!
//! let album_id: Option<String> = executor
//!     .execute_and_swallow_io_errors("album-1", "Summer", || async {
//!         Ok("remote-album-42".to_string())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::adapters::store::{JobStore, ERROR_KEY_PREFIX, RESULT_KEY_PREFIX};
use crate::domain::{ErrorDetail, JobId, Result, TransferError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

/// Outcome of looking up an idempotent id
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// A successful result is cached
    Found(T),
    /// Nothing has been attempted for this id
    Absent,
    /// The last attempt failed
    Failed(ErrorDetail),
}

#[derive(Debug, Default)]
struct ExecutorState {
    job_id: Option<JobId>,
    known_values: HashMap<String, Value>,
    errors: BTreeMap<String, ErrorDetail>,
}

/// Deduplicates import side effects for one job
pub struct IdempotentImportExecutor {
    store: Arc<dyn JobStore>,
    state: Mutex<ExecutorState>,
    key_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl IdempotentImportExecutor {
    /// Creates an executor that is not yet bound to a job
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            state: Mutex::new(ExecutorState::default()),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ExecutorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn key_locks(&self) -> MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        match self.key_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn key_lock(&self, idempotent_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.key_locks()
            .entry(idempotent_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drops the map entry once no other caller holds or waits on it
    fn release_key_lock(&self, idempotent_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.key_locks();
        // One reference in the map, one held here
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(idempotent_id);
        }
    }

    /// Binds the executor to a job and reloads that job's results and errors
    ///
    /// # Errors
    ///
    /// Returns an error if the job store cannot be read or a stored error
    /// record cannot be parsed.
    pub async fn bind_job(&self, job_id: JobId) -> Result<()> {
        let results = self.store.list_data(job_id, RESULT_KEY_PREFIX).await?;
        let error_records = self.store.list_data(job_id, ERROR_KEY_PREFIX).await?;

        let mut known_values = HashMap::with_capacity(results.len());
        for (key, value) in results {
            if let Some(id) = key.strip_prefix(RESULT_KEY_PREFIX) {
                known_values.insert(id.to_string(), value);
            }
        }

        let mut errors = BTreeMap::new();
        for (key, value) in error_records {
            let Some(id) = key.strip_prefix(ERROR_KEY_PREFIX) else {
                continue;
            };
            let detail: ErrorDetail = serde_json::from_value(value).map_err(|e| {
                TransferError::Store(format!(
                    "Unable to parse error record '{key}' for job {job_id}: {e}"
                ))
            })?;
            errors.insert(id.to_string(), detail);
        }

        tracing::info!(
            job_id = %job_id,
            cached_results = known_values.len(),
            recorded_errors = errors.len(),
            "Bound idempotent executor to job"
        );

        let mut state = self.state();
        state.job_id = Some(job_id);
        state.known_values = known_values;
        state.errors = errors;
        Ok(())
    }

    /// Job this executor is bound to
    pub fn job_id(&self) -> Option<JobId> {
        self.state().job_id
    }

    fn bound_job(&self) -> Result<JobId> {
        self.job_id().ok_or_else(|| {
            TransferError::Configuration(
                "Idempotent executor used before being bound to a job".to_string(),
            )
        })
    }

    fn cached<T: DeserializeOwned>(&self, idempotent_id: &str) -> Result<Option<T>> {
        let value = self.state().known_values.get(idempotent_id).cloned();
        value
            .map(|v| {
                serde_json::from_value(v).map_err(|e| {
                    TransferError::Serialization(format!(
                        "Cached value for '{idempotent_id}' has an unexpected shape: {e}"
                    ))
                })
            })
            .transpose()
    }

    /// Runs `create` unless `idempotent_id` already succeeded; propagates every failure
    ///
    /// The failure is recorded as an `error:<id>` record before it is
    /// returned. Item-level failures are recorded as skippable.
    ///
    /// # Errors
    ///
    /// Returns the error raised by `create`, or a store error.
    pub async fn execute_or_throw<T, F, Fut>(
        &self,
        idempotent_id: &str,
        item_name: &str,
        create: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let job_id = self.bound_job()?;
        let lock = self.key_lock(idempotent_id);
        let outcome = {
            let _guard = lock.lock().await;
            self.execute_locked(job_id, idempotent_id, item_name, create).await
        };
        self.release_key_lock(idempotent_id, lock);
        outcome
    }

    async fn execute_locked<T, F, Fut>(
        &self,
        job_id: JobId,
        idempotent_id: &str,
        item_name: &str,
        create: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.cached(idempotent_id)? {
            tracing::debug!(
                job_id = %job_id,
                idempotent_id = %idempotent_id,
                item = %item_name,
                "Using cached result"
            );
            return Ok(value);
        }

        match create().await {
            Ok(value) => {
                let json = serde_json::to_value(&value)?;
                self.add_result(job_id, idempotent_id, json).await;
                Ok(value)
            }
            Err(error) => {
                let detail = ErrorDetail::new(idempotent_id, item_name, &error)
                    .skippable(error.is_item_level());
                tracing::error!(
                    job_id = %job_id,
                    idempotent_id = %idempotent_id,
                    item = %item_name,
                    can_skip = detail.can_skip,
                    error = %error,
                    "Problem importing item"
                );
                self.add_error(job_id, idempotent_id, detail).await;
                Err(error)
            }
        }
    }

    /// Runs `create` unless `idempotent_id` already succeeded, swallowing item-level failures
    ///
    /// Returns `Ok(None)` when the item failed with an I/O or item error;
    /// dependents of this item must treat that as "not created".
    ///
    /// # Errors
    ///
    /// Returns any error that is not item-level.
    pub async fn execute_and_swallow_io_errors<T, F, Fut>(
        &self,
        idempotent_id: &str,
        item_name: &str,
        create: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.execute_or_throw(idempotent_id, item_name, create).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_item_level() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Cached result for `idempotent_id`
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::NotFound`] if nothing succeeded for this id,
    /// whether or not an attempt failed.
    pub fn get_cached_value<T: DeserializeOwned>(&self, idempotent_id: &str) -> Result<T> {
        self.cached(idempotent_id)?.ok_or_else(|| {
            TransferError::NotFound(format!("'{idempotent_id}' is not a known key"))
        })
    }

    /// Tri-state lookup distinguishing "never tried" from "failed"
    ///
    /// # Errors
    ///
    /// Returns an error only if a cached value cannot be deserialized as `T`.
    pub fn lookup<T: DeserializeOwned>(&self, idempotent_id: &str) -> Result<Lookup<T>> {
        if let Some(value) = self.cached(idempotent_id)? {
            return Ok(Lookup::Found(value));
        }
        Ok(match self.state().errors.get(idempotent_id) {
            Some(detail) => Lookup::Failed(detail.clone()),
            None => Lookup::Absent,
        })
    }

    /// Whether a successful result is cached for `idempotent_id`
    pub fn is_key_cached(&self, idempotent_id: &str) -> bool {
        self.state().known_values.contains_key(idempotent_id)
    }

    /// Errors currently recorded for the job
    pub fn errors(&self) -> Vec<ErrorDetail> {
        self.state().errors.values().cloned().collect()
    }

    /// Number of cached results
    pub fn cached_count(&self) -> usize {
        self.state().known_values.len()
    }

    async fn add_result(&self, job_id: JobId, idempotent_id: &str, value: Value) {
        let had_error = {
            let mut state = self.state();
            state
                .known_values
                .insert(idempotent_id.to_string(), value.clone());
            state.errors.remove(idempotent_id).is_some()
        };

        let key = format!("{RESULT_KEY_PREFIX}{idempotent_id}");
        if let Err(e) = self.store.put_data(job_id, &key, value).await {
            tracing::error!(job_id = %job_id, key = %key, error = %e, "Error writing result to job store");
        }
        if had_error {
            let error_key = format!("{ERROR_KEY_PREFIX}{idempotent_id}");
            if let Err(e) = self.store.remove_data(job_id, &error_key).await {
                tracing::error!(job_id = %job_id, key = %error_key, error = %e, "Error clearing resolved error");
            }
        }
    }

    async fn add_error(&self, job_id: JobId, idempotent_id: &str, detail: ErrorDetail) {
        self.state()
            .errors
            .insert(idempotent_id.to_string(), detail.clone());

        let key = format!("{ERROR_KEY_PREFIX}{idempotent_id}");
        let value = match serde_json::to_value(&detail) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(job_id = %job_id, key = %key, error = %e, "Unable to serialize error detail");
                return;
            }
        };
        if let Err(e) = self.store.put_data(job_id, &key, value).await {
            tracing::error!(job_id = %job_id, key = %key, error = %e, "Error writing error detail to job store");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::InMemoryJobStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn bound() -> (IdempotentImportExecutor, Arc<InMemoryJobStore>, JobId) {
        let store = Arc::new(InMemoryJobStore::new());
        let executor = IdempotentImportExecutor::new(store.clone());
        let job_id = JobId::new();
        executor.bind_job(job_id).await.unwrap();
        (executor, store, job_id)
    }

    #[tokio::test]
    async fn test_unbound_executor_fails() {
        let executor = IdempotentImportExecutor::new(Arc::new(InMemoryJobStore::new()));
        let err = executor
            .execute_or_throw("a", "a", || async { Ok(1u32) })
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_get_cached_value_not_found() {
        let (executor, _, _) = bound().await;
        let err = executor.get_cached_value::<String>("missing").unwrap_err();
        assert!(matches!(err, TransferError::NotFound(_)));
        assert!(!executor.is_key_cached("missing"));
    }

    #[tokio::test]
    async fn test_item_error_is_swallowed_and_recorded() {
        let (executor, store, job_id) = bound().await;
        let result: Option<String> = executor
            .execute_and_swallow_io_errors("photo-1", "beach.jpg", || async {
                Err(TransferError::Io("connection reset".into()))
            })
            .await
            .unwrap();
        assert!(result.is_none());

        let errors = executor.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].can_skip);
        assert_eq!(errors[0].title, "beach.jpg");

        assert!(store
            .find_data(job_id, "error:photo-1")
            .await
            .unwrap()
            .is_some());
        assert!(matches!(
            executor.lookup::<String>("photo-1").unwrap(),
            Lookup::Failed(_)
        ));
        assert!(matches!(
            executor.get_cached_value::<String>("photo-1"),
            Err(TransferError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fatal_error_propagates() {
        let (executor, _, _) = bound().await;
        let err = executor
            .execute_and_swallow_io_errors::<String, _, _>("album-1", "Trip", || async {
                Err(TransferError::DestinationFull("quota".into()))
            })
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        let errors = executor.errors();
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].can_skip);
    }

    #[tokio::test]
    async fn test_execute_or_throw_records_item_error() {
        let (executor, _, _) = bound().await;
        let err = executor
            .execute_or_throw::<String, _, _>("c1", "Ada", || async {
                Err(TransferError::Item("rejected".into()))
            })
            .await
            .unwrap_err();
        assert!(err.is_item_level());
        assert_eq!(executor.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_calls_create_once() {
        let (executor, _, _) = bound().await;
        let calls = AtomicUsize::new(0);
        let calls = &calls;

        let create = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok("remote-1".to_string())
        };
        let (a, b) = tokio::join!(
            executor.execute_or_throw("album-1", "Trip", create),
            executor.execute_or_throw("album-1", "Trip", create),
        );

        assert_eq!(a.unwrap(), "remote-1");
        assert_eq!(b.unwrap(), "remote-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_key_locks_are_released_after_use() {
        let (executor, _, _) = bound().await;
        for i in 0..20 {
            let id = format!("photo-{i}");
            executor
                .execute_and_swallow_io_errors(&id, &id, move || async move { Ok(i) })
                .await
                .unwrap();
        }
        executor
            .execute_and_swallow_io_errors::<u32, _, _>("broken", "broken", || async {
                Err(TransferError::Io("reset".into()))
            })
            .await
            .unwrap();

        assert_eq!(executor.cached_count(), 20);
        assert!(executor.key_locks().is_empty());
    }

    #[tokio::test]
    async fn test_key_lock_survives_while_contended() {
        let (executor, _, _) = bound().await;
        let create = || async {
            tokio::task::yield_now().await;
            Ok("remote".to_string())
        };
        let (a, b, c) = tokio::join!(
            executor.execute_or_throw("album-1", "Trip", create),
            executor.execute_or_throw("album-1", "Trip", create),
            executor.execute_or_throw("album-1", "Trip", create),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert!(executor.key_locks().is_empty());
    }
}
