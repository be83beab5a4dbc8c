//! Local directory exporter
//!
//! Every subdirectory is a container and every regular file is an item.
//! Files are paged by offset; subdirectories are reported on the first page
//! of their parent so the copier can traverse them afterwards.

use crate::adapters::traits::{AuthData, Exporter};
use crate::domain::{
    ContainerResource, ContinuationData, ContinuationToken, DataItem, DataPage, DataVertical,
    DestinationContainer, ExportInformation, ExportResult, JobId, Result, TransferError,
};
use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Stable item id for a file, derived from its path below the source root
pub fn item_id(relative_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(relative_path.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Exports files below a root directory
#[derive(Debug, Clone)]
pub struct LocalExporter {
    root: PathBuf,
    data_type: DataVertical,
    page_size: usize,
}

struct Listing {
    directories: Vec<String>,
    files: Vec<(String, u64)>,
}

impl LocalExporter {
    /// Creates an exporter rooted at `root`
    pub fn new(root: impl Into<PathBuf>, data_type: DataVertical, page_size: usize) -> Self {
        Self {
            root: root.into(),
            data_type,
            page_size: page_size.max(1),
        }
    }

    fn directory_for(&self, container: Option<&ContainerResource>) -> PathBuf {
        match container {
            Some(c) => self.root.join(&c.id),
            None => self.root.clone(),
        }
    }

    async fn list(&self, dir: &Path) -> Result<Listing> {
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TransferError::NotFound(format!("Source directory {} does not exist", dir.display()))
            } else {
                TransferError::Transient(format!("Unable to list {}: {e}", dir.display()))
            }
        })?;

        let mut directories = Vec::new();
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                directories.push(name);
            } else if metadata.is_file() {
                files.push((name, metadata.len()));
            }
        }
        directories.sort();
        files.sort();
        Ok(Listing { directories, files })
    }
}

fn relative(container: Option<&ContainerResource>, name: &str) -> String {
    match container {
        Some(c) => format!("{}/{name}", c.id),
        None => name.to_string(),
    }
}

#[async_trait]
impl Exporter for LocalExporter {
    async fn export(
        &self,
        job_id: JobId,
        _auth: &AuthData,
        export_info: Option<&ExportInformation>,
    ) -> Result<ExportResult> {
        let container = export_info.and_then(|info| info.container.as_ref());
        let offset = match export_info.and_then(|info| info.page.as_ref()) {
            None => 0,
            Some(ContinuationToken::Offset(offset)) => *offset as usize,
            Some(other) => {
                return Err(TransferError::Unsupported(format!(
                    "Local exporter expects offset tokens, got {other:?}"
                )))
            }
        };

        let dir = self.directory_for(container);
        let listing = self.list(&dir).await?;
        tracing::debug!(
            job_id = %job_id,
            dir = %dir.display(),
            offset = offset,
            files = listing.files.len(),
            directories = listing.directories.len(),
            "Listed source directory"
        );

        let end = (offset + self.page_size).min(listing.files.len());
        let items: Vec<DataItem> = listing
            .files
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|(name, size)| {
                let rel = relative(container, name);
                let item = DataItem::new(item_id(&rel), name.clone(), self.data_type.as_str())
                    .with_size(*size)
                    .with_payload(json!({
                        "source_path": dir.join(name).to_string_lossy(),
                        "relative_path": rel,
                    }));
                match container {
                    Some(c) => item.in_container(c.id.clone()),
                    None => item,
                }
            })
            .collect();

        let mut page = DataPage::from_items(items);
        if let Some(c) = container {
            if !page.items.is_empty() {
                let name = c.name.clone().unwrap_or_else(|| c.id.clone());
                page = page.with_container(DestinationContainer::new(c.id.clone(), name));
            }
        }

        let mut continuation = ContinuationData::default();
        if offset == 0 {
            continuation.containers = listing
                .directories
                .iter()
                .map(|name| ContainerResource::new(relative(container, name)).named(name.clone()))
                .collect();
        }
        let data = (!page.is_empty()).then_some(page);

        if end < listing.files.len() {
            continuation.next_page = Some(ContinuationToken::Offset(end as u64));
            Ok(ExportResult::continuing(data, continuation))
        } else if continuation.containers.is_empty() {
            Ok(ExportResult::end(data))
        } else {
            Ok(ExportResult::end(data).with_continuation(continuation))
        }
    }
}
