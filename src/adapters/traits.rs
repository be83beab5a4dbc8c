//! Vendor adapter traits
//!
//! One `Exporter`/`Importer` pair exists per (service, data vertical). The
//! copier only sees these traits; vendor wire formats stay inside the
//! implementations.

use crate::config::SecretString;
use crate::core::idempotent::IdempotentImportExecutor;
use crate::domain::{DataPage, ExportInformation, ExportResult, ImportResult, JobId, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;

/// Credentials handed to an adapter for one job
///
/// Tokens stay wrapped so they never end up in logs.
#[derive(Debug, Clone, Default)]
pub struct AuthData {
    /// Bearer or API token
    pub access_token: Option<SecretString>,

    /// Token used to refresh `access_token`, when the vendor issues one
    pub refresh_token: Option<SecretString>,
}

impl AuthData {
    /// No credentials
    pub fn none() -> Self {
        Self::default()
    }

    /// Credentials with only an access token
    pub fn bearer(token: SecretString) -> Self {
        Self {
            access_token: Some(token),
            refresh_token: None,
        }
    }

    /// `Authorization` header value for the access token
    pub fn authorization_header(&self) -> Option<String> {
        self.access_token
            .as_ref()
            .map(|t| format!("Bearer {}", t.expose_secret().as_str()))
    }
}

/// Reads one page of data from a source service
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Exports the page described by `export_info`
    ///
    /// `None` means the first page of the top-level listing.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::domain::TransferError`] whose variant tells the
    /// copier whether to retry, skip or stop the job.
    async fn export(
        &self,
        job_id: JobId,
        auth: &AuthData,
        export_info: Option<&ExportInformation>,
    ) -> Result<ExportResult>;
}

/// Writes one page of data to a destination service
#[async_trait]
pub trait Importer: Send + Sync {
    /// Imports `page`, creating each side effect through `executor`
    ///
    /// Per-item failures must go through the executor so they are recorded
    /// and skipped instead of failing the page.
    ///
    /// # Errors
    ///
    /// Returns page-level or job-fatal failures.
    async fn import_page(
        &self,
        job_id: JobId,
        executor: &IdempotentImportExecutor,
        auth: &AuthData,
        page: &DataPage,
    ) -> Result<ImportResult>;
}
