//! In-memory job store
//!
//! Used by tests and single-process runs that do not need to survive a
//! restart. All state sits behind one lock, so every mutation is atomic.

use super::traits::{collect_errors, upsert_errors, JobStore, ERROR_KEY_PREFIX, RESULT_KEY_PREFIX};
use crate::domain::{
    merge_counts, ErrorDetail, ItemCounts, JobId, JobProgress, Result, TransferError, TransferJob,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Everything stored for one job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct JobEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<TransferJob>,
    #[serde(default)]
    pub counts: ItemCounts,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
}

impl JobEntry {
    pub(crate) fn progress(&self) -> JobProgress {
        let records = self
            .data
            .range(ERROR_KEY_PREFIX.to_string()..)
            .take_while(|(k, _)| k.starts_with(ERROR_KEY_PREFIX))
            .map(|(k, v)| (k.clone(), v.clone()));
        // An item that later succeeded is no longer an error
        let unresolved: Vec<ErrorDetail> = self
            .errors
            .iter()
            .filter(|e| !self.data.contains_key(&format!("{RESULT_KEY_PREFIX}{}", e.id)))
            .cloned()
            .collect();
        JobProgress {
            counts: self.counts.clone(),
            bytes: self.bytes,
            errors: collect_errors(&unresolved, records),
        }
    }

    pub(crate) fn create_data(&mut self, job_id: JobId, key: &str, value: Value) -> Result<()> {
        if self.data.contains_key(key) {
            return Err(TransferError::Store(format!(
                "Data record '{key}' already exists for job {job_id}"
            )));
        }
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    pub(crate) fn update_data(&mut self, job_id: JobId, key: &str, value: Value) -> Result<()> {
        match self.data.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(TransferError::NotFound(format!(
                "Data record '{key}' for job {job_id}"
            ))),
        }
    }

    pub(crate) fn put_data(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub(crate) fn list_data(&self, prefix: &str) -> Vec<(String, Value)> {
        self.data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub(crate) fn add_counts(&mut self, counts: &ItemCounts) {
        merge_counts(&mut self.counts, counts);
    }

    pub(crate) fn add_errors(&mut self, errors: &[ErrorDetail]) {
        upsert_errors(&mut self.errors, errors);
    }
}

/// Job store kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, JobEntry>>,
}

impl InMemoryJobStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_job(&self, job: &TransferJob) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs.entry(job.id).or_default();
        if entry.job.is_some() {
            return Err(TransferError::Store(format!("Job {} already exists", job.id)));
        }
        entry.job = Some(job.clone());
        Ok(())
    }

    async fn find_job(&self, job_id: JobId) -> Result<Option<TransferJob>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(&job_id).and_then(|e| e.job.clone()))
    }

    async fn update_job(&self, job: &TransferJob) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job.id).and_then(|e| e.job.as_mut()) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(TransferError::NotFound(format!("Job {}", job.id))),
        }
    }

    async fn list_jobs(&self) -> Result<Vec<TransferJob>> {
        let jobs = self.jobs.read().await;
        let mut list: Vec<TransferJob> = jobs.values().filter_map(|e| e.job.clone()).collect();
        list.sort_by_key(|j| j.created_at);
        Ok(list)
    }

    async fn add_counts(&self, job_id: JobId, counts: &ItemCounts) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        jobs.entry(job_id).or_default().add_counts(counts);
        Ok(())
    }

    async fn add_bytes(&self, job_id: JobId, bytes: u64) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        jobs.entry(job_id).or_default().bytes += bytes;
        Ok(())
    }

    async fn add_errors_to_job(&self, job_id: JobId, errors: &[ErrorDetail]) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        jobs.entry(job_id).or_default().add_errors(errors);
        Ok(())
    }

    async fn job_progress(&self, job_id: JobId) -> Result<JobProgress> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(&job_id).map(JobEntry::progress).unwrap_or_default())
    }

    async fn create_data(&self, job_id: JobId, key: &str, value: Value) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        jobs.entry(job_id).or_default().create_data(job_id, key, value)
    }

    async fn update_data(&self, job_id: JobId, key: &str, value: Value) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job_id) {
            Some(entry) => entry.update_data(job_id, key, value),
            None => Err(TransferError::NotFound(format!(
                "Data record '{key}' for job {job_id}"
            ))),
        }
    }

    async fn put_data(&self, job_id: JobId, key: &str, value: Value) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        jobs.entry(job_id).or_default().put_data(key, value);
        Ok(())
    }

    async fn find_data(&self, job_id: JobId, key: &str) -> Result<Option<Value>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(&job_id).and_then(|e| e.data.get(key).cloned()))
    }

    async fn remove_data(&self, job_id: JobId, key: &str) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        if let Some(entry) = jobs.get_mut(&job_id) {
            entry.data.remove(key);
        }
        Ok(())
    }

    async fn list_data(&self, job_id: JobId, prefix: &str) -> Result<Vec<(String, Value)>> {
        let jobs = self.jobs.read().await;
        Ok(jobs
            .get(&job_id)
            .map(|e| e.list_data(prefix))
            .unwrap_or_default())
    }
}
