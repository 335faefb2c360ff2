//! Ownership scope shared by folders, files, and pending uploads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The context under which folders and files are created and filtered.
///
/// The two variants are mutually exclusive: personal data carries no
/// workspace id, and workspace data is visible to every member regardless
/// of which user created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OwnerScope {
    /// A user's own, non-workspace data.
    Personal {
        /// Owning user.
        user_id: Uuid,
    },
    /// Data shared through a workspace.
    Workspace {
        /// Owning workspace.
        workspace_id: Uuid,
    },
}

impl OwnerScope {
    /// Scope a row owned by `user_id` with `workspace_id` belongs to.
    pub fn of(user_id: Uuid, workspace_id: Option<Uuid>) -> Self {
        match workspace_id {
            Some(workspace_id) => Self::Workspace { workspace_id },
            None => Self::Personal { user_id },
        }
    }

    /// Workspace id, if this is a workspace scope.
    pub fn workspace_id(&self) -> Option<Uuid> {
        match self {
            Self::Personal { .. } => None,
            Self::Workspace { workspace_id } => Some(*workspace_id),
        }
    }

    /// Whether a row owned by `user_id` with `workspace_id` falls in this scope.
    pub fn contains(&self, user_id: Uuid, workspace_id: Option<Uuid>) -> bool {
        match self {
            Self::Personal { user_id: owner } => workspace_id.is_none() && user_id == *owner,
            Self::Workspace { workspace_id: ws } => workspace_id == Some(*ws),
        }
    }

    /// Bind values for the `(user_id, workspace_id)` predicate used in SQL.
    ///
    /// Queries use `($1::uuid IS NULL OR workspace_id = $1)` style clauses; a
    /// personal scope binds `(Some(user), None)` and a workspace scope
    /// `(None, Some(ws))`.
    pub fn sql_binds(&self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            Self::Personal { user_id } => (Some(*user_id), None),
            Self::Workspace { workspace_id } => (None, Some(*workspace_id)),
        }
    }
}
