//! Retry-wrapped exporter and importer
//!
//! Each wraps one adapter in a [`RetryingCallable`], converts `Error`
//! results into failed attempts and reports per-attempt metrics.

use crate::adapters::metrics::MetricRecorder;
use crate::adapters::traits::{AuthData, Exporter, Importer};
use crate::core::idempotent::IdempotentImportExecutor;
use crate::core::retry::RetryingCallable;
use crate::domain::{
    DataPage, DataVertical, ExportInformation, ExportResult, ExportResultType, ImportResult,
    JobId, RetryError, TransferError,
};
use std::sync::Arc;
use std::time::Instant;

/// Exporter with retries and attempt metrics
pub struct CallableExporter {
    exporter: Arc<dyn Exporter>,
    retry: RetryingCallable,
    metrics: Arc<dyn MetricRecorder>,
    data_type: DataVertical,
}

impl CallableExporter {
    /// Wraps `exporter`, reporting attempts under `data_type`
    pub fn new(
        exporter: Arc<dyn Exporter>,
        retry: RetryingCallable,
        metrics: Arc<dyn MetricRecorder>,
        data_type: DataVertical,
    ) -> Self {
        Self {
            exporter,
            retry,
            metrics,
            data_type,
        }
    }

    /// Exports one page
    ///
    /// An empty cursor is passed to the exporter as `None`.
    ///
    /// # Errors
    ///
    /// Returns the [`RetryError`] of the last attempt.
    pub async fn call(
        &self,
        job_id: JobId,
        auth: &AuthData,
        cursor: &ExportInformation,
    ) -> Result<ExportResult, RetryError> {
        let export_info = (*cursor != ExportInformation::default()).then_some(cursor);

        self.retry
            .call(|attempt| async move {
                let started = Instant::now();
                let result = self
                    .exporter
                    .export(job_id, auth, export_info)
                    .await
                    .and_then(|r| match r.result_type {
                        ExportResultType::Error => Err(TransferError::Other(
                            r.error.unwrap_or_else(|| "Export returned an error".to_string()),
                        )),
                        _ => Ok(r),
                    });
                self.metrics.export_page_attempt_finished(
                    self.data_type,
                    self.retry.service(),
                    result.is_ok(),
                    started.elapsed(),
                );
                tracing::debug!(job_id = %job_id, attempt = attempt, success = result.is_ok(), "Export attempt finished");
                result
            })
            .await
    }
}

/// Importer with retries and attempt metrics
pub struct CallableImporter {
    importer: Arc<dyn Importer>,
    retry: RetryingCallable,
    metrics: Arc<dyn MetricRecorder>,
    data_type: DataVertical,
}

impl CallableImporter {
    /// Wraps `importer`, reporting attempts under `data_type`
    pub fn new(
        importer: Arc<dyn Importer>,
        retry: RetryingCallable,
        metrics: Arc<dyn MetricRecorder>,
        data_type: DataVertical,
    ) -> Self {
        Self {
            importer,
            retry,
            metrics,
            data_type,
        }
    }

    /// Imports one page
    ///
    /// # Errors
    ///
    /// Returns the [`RetryError`] of the last attempt.
    pub async fn call(
        &self,
        job_id: JobId,
        executor: &IdempotentImportExecutor,
        auth: &AuthData,
        page: &DataPage,
    ) -> Result<ImportResult, RetryError> {
        self.retry
            .call(|attempt| async move {
                let started = Instant::now();
                let result = self
                    .importer
                    .import_page(job_id, executor, auth, page)
                    .await
                    .and_then(|r| {
                        if r.is_ok() {
                            Ok(r)
                        } else {
                            Err(TransferError::Other(
                                r.error.unwrap_or_else(|| "Import returned an error".to_string()),
                            ))
                        }
                    });
                self.metrics.import_page_attempt_finished(
                    self.data_type,
                    self.retry.service(),
                    result.is_ok(),
                    started.elapsed(),
                );
                tracing::debug!(job_id = %job_id, attempt = attempt, success = result.is_ok(), "Import attempt finished");
                result
            })
            .await
    }
}
