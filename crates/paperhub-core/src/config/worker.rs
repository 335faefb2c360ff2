//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Dispatch pool and maintenance scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent dispatches to the AI worker.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Capacity of the outbound dispatch queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Attempts per dispatch before it is reported as failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff between attempts, multiplied by the attempt number.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
    /// Live jobs older than this are reconciled as timed out.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_minutes: i64,
    /// Cron expression for the pending upload reaper.
    #[serde(default = "default_upload_sweep_cron")]
    pub upload_sweep_cron: String,
    /// Cron expression for stale job reconciliation.
    #[serde(default = "default_reconcile_cron")]
    pub reconcile_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            job_timeout_minutes: default_job_timeout(),
            upload_sweep_cron: default_upload_sweep_cron(),
            reconcile_cron: default_reconcile_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    500
}

fn default_job_timeout() -> i64 {
    30
}

fn default_upload_sweep_cron() -> String {
    "0 */15 * * * *".to_string()
}

fn default_reconcile_cron() -> String {
    "0 */5 * * * *".to_string()
}
