//! Export scheduler: daily snapshot handoff to the upload collaborator.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::export::{DailySchedule, ExportError, SnapshotUploader};
use crate::storage::StoreReader;

/// Default timeout for graceful shutdown (5 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs the daily export job.
///
/// Uses `tokio-cron-scheduler`; each fire is independent of the previous
/// one's outcome.
pub struct ExportScheduler {
    scheduler: JobScheduler,
    job_id: Option<uuid::Uuid>,
}

impl std::fmt::Debug for ExportScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportScheduler")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}

impl ExportScheduler {
    /// Create a scheduler with no job registered.
    pub async fn new() -> Result<Self, ExportError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| ExportError::Scheduler(e.to_string()))?;

        Ok(Self {
            scheduler,
            job_id: None,
        })
    }

    /// Register the daily export of `reader`'s store through `uploader`.
    pub async fn register(
        &mut self,
        schedule: &DailySchedule,
        reader: StoreReader,
        uploader: Arc<dyn SnapshotUploader>,
    ) -> Result<uuid::Uuid, ExportError> {
        let job_id = self
            .add_export_job(&schedule.cron_expression(), reader, Arc::clone(&uploader))
            .await?;

        tracing::info!(
            job_id = %job_id,
            schedule = %schedule,
            uploader = uploader.kind(),
            next = ?schedule.next_fire_after(Utc::now()),
            "Export job registered"
        );
        Ok(job_id)
    }

    async fn add_export_job(
        &mut self,
        expr: &str,
        reader: StoreReader,
        uploader: Arc<dyn SnapshotUploader>,
    ) -> Result<uuid::Uuid, ExportError> {
        let job = create_job(expr, reader, uploader)?;
        let job_id = self
            .scheduler
            .add(job)
            .await
            .map_err(|e| ExportError::Scheduler(e.to_string()))?;
        self.job_id = Some(job_id);
        Ok(job_id)
    }

    /// Id of the registered export job, if any.
    pub fn job_id(&self) -> Option<uuid::Uuid> {
        self.job_id
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), ExportError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| ExportError::Scheduler(e.to_string()))?;
        tracing::info!("Export scheduler started");
        Ok(())
    }

    /// Gracefully shutdown the scheduler with default timeout.
    pub async fn shutdown(self) -> Result<(), ExportError> {
        self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT).await
    }

    /// Shutdown with custom timeout.
    pub async fn shutdown_with_timeout(mut self, timeout: Duration) -> Result<(), ExportError> {
        match tokio::time::timeout(timeout, self.scheduler.shutdown()).await {
            Ok(Ok(())) => {
                tracing::info!("Export scheduler shutdown complete");
                Ok(())
            }
            Ok(Err(e)) => Err(ExportError::Scheduler(e.to_string())),
            Err(_) => {
                tracing::warn!("Export scheduler shutdown timed out");
                Ok(())
            }
        }
    }
}

fn create_job(
    expr: &str,
    reader: StoreReader,
    uploader: Arc<dyn SnapshotUploader>,
) -> Result<Job, ExportError> {
    Job::new_cron_job_async(expr, move |_: uuid::Uuid, _: JobScheduler| {
        let (reader, uploader) = (reader.clone(), Arc::clone(&uploader));
        Box::pin(async move {
            // Failures are logged inside; the next fire is unaffected.
            let _ = run_export(&reader, uploader.as_ref()).await;
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    })
    .map_err(|e| ExportError::Scheduler(e.to_string()))
}

/// Take a snapshot handle and hand it to the uploader once.
///
/// Returns the assigned remote name. Errors are logged here as well, so
/// callers that only fire and forget lose nothing.
pub async fn run_export(
    reader: &StoreReader,
    uploader: &dyn SnapshotUploader,
) -> Result<String, ExportError> {
    let start = std::time::Instant::now();
    let snapshot = reader.snapshot();
    tracing::info!(
        path = %snapshot.path().display(),
        uploader = uploader.kind(),
        "Export started"
    );

    let result = uploader.upload(&snapshot).await;
    let duration_ms = start.elapsed().as_millis();

    match &result {
        Ok(name) => tracing::info!(name = %name, duration_ms, "Export completed"),
        Err(e) => tracing::error!(error = %e, duration_ms, "Export failed"),
    }
    result
}
