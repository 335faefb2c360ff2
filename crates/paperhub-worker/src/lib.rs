//! Background processing for PaperHub.
//!
//! This crate provides:
//! - An HTTP client for the external AI summarization worker
//! - A dispatch pool draining the summary queue with retries
//! - A cron scheduler for the upload sweep and job reconciliation

pub mod ai_client;
pub mod dispatch;
pub mod jobs;
pub mod scheduler;

pub use ai_client::{AiClient, DeliveryError, HttpAiClient};
pub use dispatch::{DispatchOutcome, DispatchWorker};
pub use jobs::{MaintenanceTask, ReconcileJobsTask, UploadSweepTask};
pub use scheduler::MaintenanceScheduler;
