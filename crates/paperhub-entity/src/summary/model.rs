//! Summary entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::style::SummaryStyle;

/// One immutable summary version of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Summary {
    /// Unique summary identifier.
    pub id: Uuid,
    /// File the summary describes.
    pub file_id: Uuid,
    /// Version, increasing per file starting at 1.
    pub version: i32,
    /// Whether this is the authoritative version.
    pub is_current: bool,
    /// Generated title.
    pub title: Option<String>,
    /// Summary text.
    pub content: String,
    /// Requested style.
    pub style: SummaryStyle,
    /// Extra instructions supplied with the request.
    pub custom_instructions: Option<String>,
    /// Model that produced the summary.
    pub model_used: Option<String>,
    /// Prompt tokens consumed.
    pub prompt_tokens: Option<i32>,
    /// Completion tokens produced.
    pub completion_tokens: Option<i32>,
    /// Wall-clock generation time.
    pub processing_duration_ms: Option<i32>,
    /// Summary language.
    pub language: String,
    /// When the version was stored.
    pub created_at: DateTime<Utc>,
}

/// Data for a new summary version; version and current flag are assigned
/// by the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSummary {
    /// File the summary describes.
    pub file_id: Uuid,
    /// Generated title.
    pub title: Option<String>,
    /// Summary text.
    pub content: String,
    /// Requested style.
    pub style: SummaryStyle,
    /// Extra instructions.
    pub custom_instructions: Option<String>,
    /// Model that produced the summary.
    pub model_used: Option<String>,
    /// Prompt tokens consumed.
    pub prompt_tokens: Option<i32>,
    /// Completion tokens produced.
    pub completion_tokens: Option<i32>,
    /// Wall-clock generation time.
    pub processing_duration_ms: Option<i32>,
    /// Summary language.
    pub language: String,
}

/// A compact row in a file's summary history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryHistoryItem {
    /// Summary ID.
    pub id: Uuid,
    /// Version number.
    pub version: i32,
    /// Generated title.
    pub title: Option<String>,
    /// Requested style.
    pub style: SummaryStyle,
    /// Extra instructions.
    pub custom_instructions: Option<String>,
    /// Model used.
    pub model_used: Option<String>,
    /// Generation time.
    pub processing_duration_ms: Option<i32>,
    /// Language.
    pub language: String,
    /// Current flag.
    pub is_current: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl From<&Summary> for SummaryHistoryItem {
    fn from(s: &Summary) -> Self {
        Self {
            id: s.id,
            version: s.version,
            title: s.title.clone(),
            style: s.style,
            custom_instructions: s.custom_instructions.clone(),
            model_used: s.model_used.clone(),
            processing_duration_ms: s.processing_duration_ms,
            language: s.language.clone(),
            is_current: s.is_current,
            created_at: s.created_at,
        }
    }
}
