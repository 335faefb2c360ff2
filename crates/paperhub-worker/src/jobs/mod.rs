//! Scheduled maintenance tasks.

pub mod reconcile;
pub mod upload_sweep;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use paperhub_core::result::AppResult;

pub use reconcile::ReconcileJobsTask;
pub use upload_sweep::UploadSweepTask;

/// A periodic maintenance task.
#[async_trait]
pub trait MaintenanceTask: Send + Sync + std::fmt::Debug {
    /// Name used in logs and schedules.
    fn name(&self) -> &'static str;

    /// Run once as of `now` and report what was done.
    async fn run(&self, now: DateTime<Utc>) -> AppResult<Value>;
}
