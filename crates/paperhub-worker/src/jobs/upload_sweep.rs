//! Reaper for abandoned presigned uploads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

use paperhub_core::result::AppResult;
use paperhub_service::UploadService;

use super::MaintenanceTask;

/// Removes pending uploads past expiry plus the retention period.
#[derive(Debug, Clone)]
pub struct UploadSweepTask {
    uploads: UploadService,
}

impl UploadSweepTask {
    /// Create a new sweep task.
    pub fn new(uploads: UploadService) -> Self {
        Self { uploads }
    }
}

#[async_trait]
impl MaintenanceTask for UploadSweepTask {
    fn name(&self) -> &'static str {
        "upload_sweep"
    }

    async fn run(&self, now: DateTime<Utc>) -> AppResult<Value> {
        let report = self.uploads.sweep_expired(now).await?;
        info!(
            removed = report.removed,
            objects_failed = report.objects_failed,
            "Upload sweep finished"
        );
        Ok(serde_json::json!({
            "task": self.name(),
            "removed": report.removed,
            "objects_failed": report.objects_failed,
        }))
    }
}
