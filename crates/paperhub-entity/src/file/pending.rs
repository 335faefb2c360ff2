//! Pending (in-flight) presigned upload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::scope::OwnerScope;

/// A presigned upload that has been issued but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PendingUpload {
    /// Upload ID handed to the client.
    pub id: Uuid,
    /// Requesting user.
    pub user_id: Uuid,
    /// Target workspace.
    pub workspace_id: Option<Uuid>,
    /// Target folder.
    pub folder_id: Option<Uuid>,
    /// Filename as supplied by the client.
    pub filename: String,
    /// Declared size in bytes.
    pub file_size: i64,
    /// Declared content type.
    pub content_type: String,
    /// Object key shared by the staging and permanent buckets.
    pub storage_path: String,
    /// When the presigned URL stops working.
    pub expires_at: DateTime<Utc>,
    /// When the upload was issued.
    pub created_at: DateTime<Utc>,
}

impl PendingUpload {
    /// Whether this upload belongs to the given scope.
    pub fn in_scope(&self, scope: &OwnerScope) -> bool {
        scope.contains(self.user_id, self.workspace_id)
    }

    /// Whether the presigned URL has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Data required to record a new pending upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePendingUpload {
    /// Upload ID, also used in the storage path.
    pub id: Uuid,
    /// Requesting user.
    pub user_id: Uuid,
    /// Target workspace.
    pub workspace_id: Option<Uuid>,
    /// Target folder.
    pub folder_id: Option<Uuid>,
    /// Client filename.
    pub filename: String,
    /// Declared size.
    pub file_size: i64,
    /// Declared content type.
    pub content_type: String,
    /// Object key.
    pub storage_path: String,
    /// Expiry of the presigned URL.
    pub expires_at: DateTime<Utc>,
}
