//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::ProcessingStatus;
use crate::scope::OwnerScope;

/// A stored PDF document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: Uuid,
    /// User that uploaded the file.
    pub user_id: Uuid,
    /// Workspace the file belongs to (None for personal files).
    pub workspace_id: Option<Uuid>,
    /// Containing folder (None = root).
    pub folder_id: Option<Uuid>,
    /// Sanitized filename.
    pub filename: String,
    /// Filename as supplied by the user.
    pub original_filename: String,
    /// Object key in the files bucket.
    pub storage_path: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub file_size: i64,
    /// Page count, filled after processing.
    pub page_count: Option<i32>,
    /// Processing status.
    pub status: ProcessingStatus,
    /// Error from the last failed attempt.
    pub error_message: Option<String>,
    /// When the upload was confirmed.
    pub uploaded_at: DateTime<Utc>,
    /// When the last attempt finished.
    pub processed_at: Option<DateTime<Utc>>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// Whether this file belongs to the given scope.
    pub fn in_scope(&self, scope: &OwnerScope) -> bool {
        scope.contains(self.user_id, self.workspace_id)
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// Uploading user.
    pub user_id: Uuid,
    /// Owning workspace.
    pub workspace_id: Option<Uuid>,
    /// Target folder.
    pub folder_id: Option<Uuid>,
    /// Sanitized filename.
    pub filename: String,
    /// User-supplied filename.
    pub original_filename: String,
    /// Object key in the files bucket.
    pub storage_path: String,
    /// MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub file_size: i64,
    /// Page count, if known.
    pub page_count: Option<i32>,
}

/// A row in a file listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileListItem {
    /// File ID.
    pub id: Uuid,
    /// Sanitized filename.
    pub filename: String,
    /// User-supplied filename.
    pub original_filename: String,
    /// Containing folder.
    pub folder_id: Option<Uuid>,
    /// Size in bytes.
    pub file_size: i64,
    /// Page count.
    pub page_count: Option<i32>,
    /// Processing status.
    pub status: ProcessingStatus,
    /// Whether a current summary exists.
    pub has_summary: bool,
    /// When the upload was confirmed.
    pub uploaded_at: DateTime<Utc>,
    /// When the last attempt finished.
    pub processed_at: Option<DateTime<Utc>>,
}

impl FileListItem {
    /// Build a list item from a file and its summary flag.
    pub fn from_file(file: &File, has_summary: bool) -> Self {
        Self {
            id: file.id,
            filename: file.filename.clone(),
            original_filename: file.original_filename.clone(),
            folder_id: file.folder_id,
            file_size: file.file_size,
            page_count: file.page_count,
            status: file.status,
            has_summary,
            uploaded_at: file.uploaded_at,
            processed_at: file.processed_at,
        }
    }
}
