//! Workspace and membership models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A shared workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Workspace {
    /// Unique workspace identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Join code, stored uppercase.
    pub invite_code: String,
    /// Owning user.
    pub owner_id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Role of a member inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "workspace_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    /// Created the workspace.
    Owner,
    /// May see workspace settings.
    Admin,
    /// Regular member.
    Member,
}

impl WorkspaceRole {
    /// Whether this role may see the invite code.
    pub fn can_view_invite_code(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for WorkspaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Membership of a user in a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WorkspaceMember {
    /// Workspace.
    pub workspace_id: Uuid,
    /// Member user.
    pub user_id: Uuid,
    /// Member role.
    pub role: WorkspaceRole,
    /// When the user joined.
    pub joined_at: DateTime<Utc>,
}

/// A workspace as seen by one of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WorkspaceWithRole {
    /// The workspace.
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub workspace: Workspace,
    /// The member's role.
    pub role: WorkspaceRole,
}

/// Canonical form of an invite code: trimmed and uppercase.
pub fn normalize_invite_code(code: &str) -> String {
    code.trim().to_uppercase()
}
