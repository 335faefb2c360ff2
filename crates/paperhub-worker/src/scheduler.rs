//! Cron scheduler for maintenance tasks.

use std::sync::Arc;

use chrono::Utc;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing::{debug, error, info};

use paperhub_core::config::worker::WorkerConfig;
use paperhub_core::error::AppError;

use crate::jobs::MaintenanceTask;

/// Runs maintenance tasks on cron schedules.
pub struct MaintenanceScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
}

impl std::fmt::Debug for MaintenanceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceScheduler").finish()
    }
}

impl MaintenanceScheduler {
    /// Create a new scheduler
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;
        Ok(Self { scheduler })
    }

    /// Register the upload sweep and job reconciliation on their configured
    /// schedules.
    pub async fn register_default_tasks(
        &self,
        config: &WorkerConfig,
        upload_sweep: Arc<dyn MaintenanceTask>,
        reconcile: Arc<dyn MaintenanceTask>,
    ) -> Result<(), AppError> {
        self.register(&config.upload_sweep_cron, upload_sweep).await?;
        self.register(&config.reconcile_cron, reconcile).await?;
        info!("All maintenance tasks registered");
        Ok(())
    }

    /// Run `task` on the cron expression `schedule`.
    pub async fn register(
        &self,
        schedule: &str,
        task: Arc<dyn MaintenanceTask>,
    ) -> Result<(), AppError> {
        let name = task.name();
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let task = Arc::clone(&task);
            Box::pin(async move {
                debug!(task = task.name(), "Running maintenance task");
                if let Err(e) = task.run(Utc::now()).await {
                    error!(task = task.name(), error = %e, "Maintenance task failed");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid schedule '{schedule}' for {name}: {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {name} schedule: {e}")))?;

        info!(task = name, schedule, "Registered maintenance task");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;
        info!("Maintenance scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;
        info!("Maintenance scheduler shut down");
        Ok(())
    }
}
