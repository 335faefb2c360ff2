//! Request context carrying the acting user and the requested workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for the current authenticated request.
///
/// Built by whatever surface authenticates the caller and passed into
/// service methods so that every operation knows *who* is acting and in
/// *which* workspace they asked to work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: Uuid,
    /// Workspace the caller asked to operate in, if any.
    ///
    /// This is a request, not a grant: [`crate::WorkspaceAccess`] falls
    /// back to the personal scope when the caller is not a member.
    pub workspace_id: Option<Uuid>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(user_id: Uuid, workspace_id: Option<Uuid>) -> Self {
        Self {
            user_id,
            workspace_id,
            request_time: Utc::now(),
        }
    }

    /// Context for a user acting on their personal data.
    pub fn personal(user_id: Uuid) -> Self {
        Self::new(user_id, None)
    }

    /// The same caller, asking for another workspace.
    pub fn in_workspace(&self, workspace_id: Uuid) -> Self {
        Self {
            workspace_id: Some(workspace_id),
            ..self.clone()
        }
    }
}
