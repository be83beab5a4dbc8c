//! Grouped uploads for importers
//!
//! Items bound for different destination containers have no ordering
//! dependency and upload concurrently. Items sharing a container upload one
//! after another, after the container exists.

use crate::core::idempotent::IdempotentImportExecutor;
use crate::domain::{DataItem, Result, TransferError};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

/// Per-item outcome of a grouped upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReport<T> {
    /// Items created in this call, by idempotent id
    pub uploaded: Vec<(String, T)>,

    /// Items that failed with an item-level error
    pub failed: Vec<String>,

    /// Items skipped because an earlier attempt already created them
    pub skipped: usize,
}

impl<T> Default for UploadReport<T> {
    fn default() -> Self {
        Self {
            uploaded: Vec::new(),
            failed: Vec::new(),
            skipped: 0,
        }
    }
}

impl<T> UploadReport<T> {
    fn absorb(&mut self, other: UploadReport<T>) {
        self.uploaded.extend(other.uploaded);
        self.failed.extend(other.failed);
        self.skipped += other.skipped;
    }
}

/// Splits a batch into upload groups, preserving item order within each
///
/// Items without a destination container each form their own group.
fn group_by_container(batch: Vec<DataItem>) -> Vec<Vec<DataItem>> {
    let mut groups: Vec<Vec<DataItem>> = Vec::new();
    let mut container_slots: Vec<(String, usize)> = Vec::new();

    for item in batch {
        match item.container_id.clone() {
            Some(container) => {
                match container_slots.iter().find(|(c, _)| *c == container) {
                    Some((_, slot)) => groups[*slot].push(item),
                    None => {
                        container_slots.push((container, groups.len()));
                        groups.push(vec![item]);
                    }
                }
            }
            None => groups.push(vec![item]),
        }
    }
    groups
}

/// Uploads `items` through the idempotent executor
///
/// Items already cached are skipped. The rest are chunked by `batch_size`;
/// within a chunk, container groups run concurrently up to
/// `max_concurrency`. Item-level failures are recorded by the executor and
/// reported in [`UploadReport::failed`].
///
/// # Errors
///
/// Returns the first failure that is not item-level. Remaining groups of
/// the current chunk are dropped and later chunks never start.
pub async fn upload_by_container<T, F, Fut>(
    executor: &IdempotentImportExecutor,
    items: Vec<DataItem>,
    max_concurrency: usize,
    batch_size: usize,
    upload: F,
) -> Result<UploadReport<T>>
where
    T: Serialize + DeserializeOwned,
    F: Fn(DataItem) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut report = UploadReport::default();

    let (cached, pending): (Vec<DataItem>, Vec<DataItem>) = items
        .into_iter()
        .partition(|item| executor.is_key_cached(&item.id));
    report.skipped = cached.len();

    let upload = &upload;
    let batch_size = batch_size.max(1);
    let mut remaining = pending.into_iter().peekable();

    while remaining.peek().is_some() {
        let batch: Vec<DataItem> = remaining.by_ref().take(batch_size).collect();
        tracing::debug!(items = batch.len(), "Uploading batch");

        let outcomes: Vec<UploadReport<T>> = stream::iter(group_by_container(batch))
            .map(|group| async move {
                let mut outcome = UploadReport::default();
                for item in group {
                    let id = item.id.clone();
                    let title = item.title.clone();
                    match executor
                        .execute_and_swallow_io_errors(&id, &title, || upload(item))
                        .await?
                    {
                        Some(value) => outcome.uploaded.push((id, value)),
                        None => outcome.failed.push(id),
                    }
                }
                Ok::<_, TransferError>(outcome)
            })
            .buffer_unordered(max_concurrency.max(1))
            .try_collect()
            .await?;

        for outcome in outcomes {
            report.absorb(outcome);
        }
    }

    Ok(report)
}
