//! Local directory importer
//!
//! Recreates the exported tree below a destination root. Directory
//! creation and file copies both go through the idempotent executor, so a
//! retried page never copies a file twice.

use crate::adapters::traits::{AuthData, Importer};
use crate::config::TransferConfig;
use crate::core::idempotent::IdempotentImportExecutor;
use crate::core::upload::upload_by_container;
use crate::domain::{DataItem, DataPage, ImportResult, ItemCounts, JobId, Result, TransferError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

/// Imports files into a destination directory
#[derive(Debug, Clone)]
pub struct LocalImporter {
    root: PathBuf,
    max_concurrency: usize,
    batch_size: usize,
}

impl LocalImporter {
    /// Creates an importer writing below `root`
    pub fn new(root: impl Into<PathBuf>, transfer: &TransferConfig) -> Self {
        Self {
            root: root.into(),
            max_concurrency: transfer.max_concurrent_uploads,
            batch_size: transfer.upload_batch_size,
        }
    }
}

fn payload_str<'a>(item: &'a DataItem, field: &str) -> Result<&'a str> {
    item.payload
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| TransferError::Item(format!("Item '{}' has no {field}", item.title)))
}

fn map_write_error(path: &Path, err: io::Error) -> TransferError {
    let message = format!("Cannot write {}: {err}", path.display());
    match err.kind() {
        io::ErrorKind::PermissionDenied => TransferError::PermissionDenied(message),
        io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => {
            TransferError::DestinationFull(message)
        }
        _ => TransferError::Io(message),
    }
}

async fn copy_item(root: &Path, item: DataItem) -> Result<u64> {
    let source = PathBuf::from(payload_str(&item, "source_path")?);
    let target = root.join(payload_str(&item, "relative_path")?);

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| map_write_error(parent, e))?;
    }
    let bytes = tokio::fs::copy(&source, &target)
        .await
        .map_err(|e| map_write_error(&target, e))?;

    tracing::trace!(source = %source.display(), target = %target.display(), bytes = bytes, "Copied file");
    Ok(bytes)
}

#[async_trait]
impl Importer for LocalImporter {
    async fn import_page(
        &self,
        job_id: JobId,
        executor: &IdempotentImportExecutor,
        _auth: &AuthData,
        page: &DataPage,
    ) -> Result<ImportResult> {
        let mut missing_dirs = HashSet::new();
        for container in &page.containers {
            let dir = self.root.join(&container.id);
            let key = format!("container:{}", container.id);
            let created = executor
                .execute_and_swallow_io_errors(&key, &container.name, || async {
                    tokio::fs::create_dir_all(&dir)
                        .await
                        .map_err(|e| map_write_error(&dir, e))?;
                    Ok(dir.to_string_lossy().into_owned())
                })
                .await?;
            if created.is_none() {
                missing_dirs.insert(container.id.as_str());
            }
        }

        // Items of a folder that could not be created fail with it
        let (orphans, items): (Vec<DataItem>, Vec<DataItem>) =
            page.items.iter().cloned().partition(|item| {
                item.container_id
                    .as_deref()
                    .is_some_and(|c| missing_dirs.contains(c))
            });
        for item in &orphans {
            let folder = item.container_id.as_deref().unwrap_or_default();
            executor
                .execute_and_swallow_io_errors::<u64, _, _>(&item.id, &item.title, move || async move {
                    Err(TransferError::Item(format!("Folder '{folder}' was not created")))
                })
                .await?;
        }

        let root = self.root.as_path();
        let report = upload_by_container(
            executor,
            items,
            self.max_concurrency,
            self.batch_size,
            |item| copy_item(root, item),
        )
        .await?;

        tracing::debug!(
            job_id = %job_id,
            uploaded = report.uploaded.len(),
            failed = report.failed.len() + orphans.len(),
            skipped = report.skipped,
            "Imported page"
        );

        let mut counts = ItemCounts::new();
        let mut bytes = 0;
        for (id, written) in &report.uploaded {
            if let Some(item) = page.items.iter().find(|i| &i.id == id) {
                *counts.entry(item.kind.clone()).or_insert(0) += 1;
            }
            bytes += written;
        }

        Ok(ImportResult::ok().with_counts(counts).with_bytes(bytes))
    }
}
