//! Export rows and formats.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use paperhub_core::error::AppError;

use super::status::ProcessingStatus;

/// Folder label used for files at the root.
pub const ROOT_FOLDER_LABEL: &str = "/";
/// Workspace label used for personal files.
pub const PERSONAL_WORKSPACE_LABEL: &str = "Personal";

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Spreadsheet-friendly CSV.
    #[default]
    Csv,
    /// Structured JSON document.
    Json,
}

impl ExportFormat {
    /// MIME type of the serialized output.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    /// File extension for downloads.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(AppError::invalid_field(
                "format",
                format!("unsupported export format '{other}'"),
            )),
        }
    }
}

/// One file joined with one of its summaries (or none).
///
/// Files with several summary versions appear once per version, newest
/// version first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ExportRow {
    /// File ID.
    pub id: Uuid,
    /// Sanitized filename.
    pub filename: String,
    /// User-supplied filename.
    pub original_filename: String,
    /// Size in bytes.
    pub file_size: i64,
    /// Page count.
    pub page_count: Option<i32>,
    /// MIME type.
    pub mime_type: String,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Processing status.
    pub status: ProcessingStatus,
    /// Folder path, or `/` for root files.
    pub folder_path: String,
    /// Workspace name, or `Personal`.
    pub workspace_name: String,
    /// Summary version.
    pub summary_version: Option<i32>,
    /// Model that produced the summary.
    pub summary_model: Option<String>,
    /// Summary creation time.
    pub summary_created_at: Option<DateTime<Utc>>,
    /// Summary processing duration.
    pub summary_duration_ms: Option<i32>,
    /// Summary text.
    pub summary_content: Option<String>,
}
