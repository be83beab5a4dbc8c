//! Copy worklist
//!
//! A stack of export cursors. The cursor on top is the one being worked
//! on; it is only popped once its iteration completes, so a persisted
//! worklist always resumes at the first unfinished page.

use crate::adapters::store::{JobStore, WORKLIST_KEY};
use crate::domain::{ContinuationData, ExportInformation, JobId, Result, TransferError};
use serde::{Deserialize, Serialize};

/// Export cursors still to visit, persisted per job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Worklist {
    stack: Vec<ExportInformation>,
}

impl Worklist {
    /// Worklist holding the initial cursor, or the top-level listing when `None`
    pub fn new(initial: Option<ExportInformation>) -> Self {
        Self {
            stack: vec![initial.unwrap_or_default()],
        }
    }

    /// Cursor to work on next
    pub fn peek(&self) -> Option<&ExportInformation> {
        self.stack.last()
    }

    /// Number of pending cursors
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// True once every cursor has finished
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Finishes the cursor on top and schedules what it discovered
    ///
    /// Discovered containers go on in reverse so the first one is visited
    /// first; the next page of the finished cursor goes on last so it runs
    /// before any of them.
    pub fn advance(&mut self, next: Option<ContinuationData>) {
        let Some(finished) = self.stack.pop() else {
            return;
        };
        let Some(next) = next else {
            return;
        };

        for container in next.containers.into_iter().rev() {
            self.stack.push(ExportInformation::for_container(container));
        }
        if let Some(page) = next.next_page {
            self.stack.push(ExportInformation {
                page: Some(page),
                container: finished.container,
            });
        }
    }

    /// Loads the persisted worklist for a job
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the record is corrupt.
    pub async fn load(store: &dyn JobStore, job_id: JobId) -> Result<Option<Self>> {
        match store.find_data(job_id, WORKLIST_KEY).await? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                TransferError::Store(format!("Corrupt worklist for job {job_id}: {e}"))
            }),
            None => Ok(None),
        }
    }

    /// Persists the worklist for a job
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub async fn save(&self, store: &dyn JobStore, job_id: JobId) -> Result<()> {
        store
            .put_data(job_id, WORKLIST_KEY, serde_json::to_value(self)?)
            .await
    }

    /// Removes the persisted worklist once a copy is complete
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the removal.
    pub async fn clear(store: &dyn JobStore, job_id: JobId) -> Result<()> {
        store.remove_data(job_id, WORKLIST_KEY).await
    }
}
