//! File processing status state machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use paperhub_core::error::AppError;

/// Processing status of a document.
///
/// ```text
/// uploaded -> pending -> processing -> completed
///                                   \-> failed
/// completed | failed -> pending -> ...
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "processing_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// Stored, never summarized.
    Uploaded,
    /// A summarization request was accepted and a job is being created.
    Pending,
    /// The job was dispatched to the AI worker.
    Processing,
    /// The last attempt produced a summary.
    Completed,
    /// The last attempt failed.
    Failed,
}

impl ProcessingStatus {
    /// Whether a summarization attempt is live.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Whether a new summarization may be requested from this status.
    pub fn can_generate(&self) -> bool {
        matches!(self, Self::Uploaded | Self::Completed | Self::Failed)
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;
        matches!(
            (self, next),
            (Uploaded | Completed | Failed, Pending)
                | (Pending, Processing)
                | (Pending | Processing, Completed | Failed)
        )
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(Self::Uploaded),
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(AppError::invalid_field(
                "status",
                format!("unknown status '{other}'"),
            )),
        }
    }
}
