//! Timeout for summarization attempts that never called back.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::info;

use paperhub_core::result::AppResult;
use paperhub_service::SummaryService;

use super::MaintenanceTask;

/// Fails live jobs older than the configured timeout.
#[derive(Debug, Clone)]
pub struct ReconcileJobsTask {
    summaries: SummaryService,
    timeout: Duration,
}

impl ReconcileJobsTask {
    /// Create a new reconcile task failing jobs older than `timeout_minutes`.
    pub fn new(summaries: SummaryService, timeout_minutes: i64) -> Self {
        Self {
            summaries,
            timeout: Duration::minutes(timeout_minutes),
        }
    }
}

#[async_trait]
impl MaintenanceTask for ReconcileJobsTask {
    fn name(&self) -> &'static str {
        "reconcile_jobs"
    }

    async fn run(&self, now: DateTime<Utc>) -> AppResult<Value> {
        let failed = self.summaries.reconcile_stale_jobs(now, self.timeout).await?;
        info!(failed, "Job reconciliation finished");
        Ok(serde_json::json!({
            "task": self.name(),
            "failed": failed,
            "timeout_minutes": self.timeout.num_minutes(),
        }))
    }
}
