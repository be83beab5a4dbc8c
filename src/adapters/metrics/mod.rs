//! Transfer metrics
//!
//! The copier and the job runner report page- and job-level events to a
//! [`MetricRecorder`]. [`LoggingMetricRecorder`] writes them as structured
//! `tracing` events; [`MultiplexMetricRecorder`] fans out to several
//! recorders.

use crate::domain::{DataVertical, ServiceId};
use std::sync::Arc;
use std::time::Duration;

/// Receives transfer events
///
/// Implementations must be cheap and must not fail; they are called on the
/// hot path of every copy iteration.
pub trait MetricRecorder: Send + Sync {
    /// A job was picked up
    fn started_job(&self, data_type: DataVertical, export_service: &ServiceId, import_service: &ServiceId);

    /// One export attempt finished
    fn export_page_attempt_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    );

    /// One export page finished, retries included
    fn export_page_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    );

    /// One import attempt finished
    fn import_page_attempt_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    );

    /// One import page finished, retries included
    fn import_page_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    );

    /// The export side of a copy finished
    fn export_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    );

    /// The import side of a copy finished
    fn import_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    );

    /// A job reached a terminal state other than cancelled
    fn finished_job(
        &self,
        data_type: DataVertical,
        export_service: &ServiceId,
        import_service: &ServiceId,
        success: bool,
        duration: Duration,
    );

    /// A job was cancelled
    fn cancelled_job(
        &self,
        data_type: DataVertical,
        export_service: &ServiceId,
        import_service: &ServiceId,
        duration: Duration,
    );
}

/// Writes every metric event to the log
#[derive(Debug, Clone, Default)]
pub struct LoggingMetricRecorder;

impl LoggingMetricRecorder {
    /// Creates a new recorder
    pub fn new() -> Self {
        Self
    }
}

macro_rules! log_metric {
    ($event:literal, $data_type:expr, $service:expr, $success:expr, $duration:expr) => {
        tracing::info!(
            target: "porter::metrics",
            event = $event,
            data_type = %$data_type,
            service = %$service,
            success = $success,
            duration_ms = $duration.as_millis() as u64,
            "metric"
        );
    };
}

impl MetricRecorder for LoggingMetricRecorder {
    fn started_job(&self, data_type: DataVertical, export_service: &ServiceId, import_service: &ServiceId) {
        tracing::info!(
            target: "porter::metrics",
            event = "job_started",
            data_type = %data_type,
            export_service = %export_service,
            import_service = %import_service,
            "metric"
        );
    }

    fn export_page_attempt_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        log_metric!("export_page_attempt_finished", data_type, service, success, duration);
    }

    fn export_page_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        log_metric!("export_page_finished", data_type, service, success, duration);
    }

    fn import_page_attempt_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        log_metric!("import_page_attempt_finished", data_type, service, success, duration);
    }

    fn import_page_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        log_metric!("import_page_finished", data_type, service, success, duration);
    }

    fn export_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        log_metric!("export_finished", data_type, service, success, duration);
    }

    fn import_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        log_metric!("import_finished", data_type, service, success, duration);
    }

    fn finished_job(
        &self,
        data_type: DataVertical,
        export_service: &ServiceId,
        import_service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        tracing::info!(
            target: "porter::metrics",
            event = "job_finished",
            data_type = %data_type,
            export_service = %export_service,
            import_service = %import_service,
            success = success,
            duration_ms = duration.as_millis() as u64,
            "metric"
        );
    }

    fn cancelled_job(
        &self,
        data_type: DataVertical,
        export_service: &ServiceId,
        import_service: &ServiceId,
        duration: Duration,
    ) {
        tracing::info!(
            target: "porter::metrics",
            event = "job_cancelled",
            data_type = %data_type,
            export_service = %export_service,
            import_service = %import_service,
            duration_ms = duration.as_millis() as u64,
            "metric"
        );
    }
}

/// Forwards every event to each wrapped recorder in order
#[derive(Clone, Default)]
pub struct MultiplexMetricRecorder {
    recorders: Vec<Arc<dyn MetricRecorder>>,
}

impl MultiplexMetricRecorder {
    /// Creates a recorder with no targets
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target recorder
    pub fn with(mut self, recorder: Arc<dyn MetricRecorder>) -> Self {
        self.recorders.push(recorder);
        self
    }

    /// Number of wrapped recorders
    pub fn len(&self) -> usize {
        self.recorders.len()
    }

    /// True when no recorder is wrapped
    pub fn is_empty(&self) -> bool {
        self.recorders.is_empty()
    }
}

impl MetricRecorder for MultiplexMetricRecorder {
    fn started_job(&self, data_type: DataVertical, export_service: &ServiceId, import_service: &ServiceId) {
        for r in &self.recorders {
            r.started_job(data_type, export_service, import_service);
        }
    }

    fn export_page_attempt_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        for r in &self.recorders {
            r.export_page_attempt_finished(data_type, service, success, duration);
        }
    }

    fn export_page_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        for r in &self.recorders {
            r.export_page_finished(data_type, service, success, duration);
        }
    }

    fn import_page_attempt_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        for r in &self.recorders {
            r.import_page_attempt_finished(data_type, service, success, duration);
        }
    }

    fn import_page_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        for r in &self.recorders {
            r.import_page_finished(data_type, service, success, duration);
        }
    }

    fn export_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        for r in &self.recorders {
            r.export_finished(data_type, service, success, duration);
        }
    }

    fn import_finished(
        &self,
        data_type: DataVertical,
        service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        for r in &self.recorders {
            r.import_finished(data_type, service, success, duration);
        }
    }

    fn finished_job(
        &self,
        data_type: DataVertical,
        export_service: &ServiceId,
        import_service: &ServiceId,
        success: bool,
        duration: Duration,
    ) {
        for r in &self.recorders {
            r.finished_job(data_type, export_service, import_service, success, duration);
        }
    }

    fn cancelled_job(
        &self,
        data_type: DataVertical,
        export_service: &ServiceId,
        import_service: &ServiceId,
        duration: Duration,
    ) {
        for r in &self.recorders {
            r.cancelled_job(data_type, export_service, import_service, duration);
        }
    }
}
