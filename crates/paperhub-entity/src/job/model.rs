//! Processing job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{JobStatus, JobType};
use crate::summary::SummaryStyle;

/// One summarization attempt for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ProcessingJob {
    /// Unique job identifier.
    pub id: Uuid,
    /// File the job works on.
    pub file_id: Uuid,
    /// Kind of work.
    pub job_type: JobType,
    /// Current status.
    pub status: JobStatus,
    /// Style the caller asked for.
    pub style: SummaryStyle,
    /// Extra instructions the caller gave, if any.
    pub custom_instructions: Option<String>,
    /// Output language the caller asked for.
    pub language: String,
    /// Error recorded when the job ended in `error`.
    pub error_message: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was dispatched.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Data for recording a new attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateJob {
    /// File to work on.
    pub file_id: Uuid,
    /// Kind of work.
    pub job_type: JobType,
    /// Requested style.
    pub style: SummaryStyle,
    /// Requested extra instructions.
    pub custom_instructions: Option<String>,
    /// Requested output language.
    pub language: String,
}

impl ProcessingJob {
    /// Whether the job still counts as the live attempt for its file.
    pub fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }
}
