//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::scope::OwnerScope;

/// Separator used in materialized folder paths.
pub const PATH_SEPARATOR: char = '/';

/// A folder in a personal or workspace hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: Uuid,
    /// User that created the folder.
    pub user_id: Uuid,
    /// Workspace the folder belongs to (None for personal folders).
    pub workspace_id: Option<Uuid>,
    /// Parent folder (None for root folders).
    pub parent_id: Option<Uuid>,
    /// Folder display name.
    pub name: String,
    /// Materialized path, e.g. `/Reports/2024`.
    pub path: String,
    /// Depth in the tree (0 = root).
    pub depth: i32,
    /// Explicit ordering among siblings.
    pub sort_order: i32,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Whether this folder belongs to the given scope.
    pub fn in_scope(&self, scope: &OwnerScope) -> bool {
        scope.contains(self.user_id, self.workspace_id)
    }

    /// Path a child named `name` would have under this folder.
    pub fn child_path(&self, name: &str) -> String {
        format!("{}{PATH_SEPARATOR}{name}", self.path)
    }

    /// Path of a folder named `name` placed under `parent` (or at the root).
    pub fn path_under(parent: Option<&Folder>, name: &str) -> String {
        match parent {
            Some(p) => p.child_path(name),
            None => format!("{PATH_SEPARATOR}{name}"),
        }
    }

    /// Depth of a folder placed under `parent` (or at the root).
    pub fn depth_under(parent: Option<&Folder>) -> i32 {
        parent.map(|p| p.depth + 1).unwrap_or(0)
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolder {
    /// User creating the folder.
    pub user_id: Uuid,
    /// Owning workspace, if any.
    pub workspace_id: Option<Uuid>,
    /// Parent folder ID.
    pub parent_id: Option<Uuid>,
    /// Folder name.
    pub name: String,
    /// Computed path.
    pub path: String,
    /// Computed depth.
    pub depth: i32,
    /// Sibling ordering.
    pub sort_order: i32,
}

/// Aggregate file statistics for one folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FolderStats {
    /// Folder the statistics belong to.
    pub folder_id: Uuid,
    /// Number of files directly in the folder.
    pub file_count: i64,
    /// Sum of file sizes in bytes.
    pub total_size: i64,
}

/// A folder together with its direct file statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderWithStats {
    /// The folder.
    #[serde(flatten)]
    pub folder: Folder,
    /// Number of files directly in the folder.
    pub file_count: i64,
    /// Sum of file sizes in bytes.
    pub total_size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(name: &str, path: &str, depth: i32) -> Folder {
        Folder {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            workspace_id: None,
            parent_id: None,
            name: name.into(),
            path: path.into(),
            depth,
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_root_path_and_depth() {
        assert_eq!(Folder::path_under(None, "Reports"), "/Reports");
        assert_eq!(Folder::depth_under(None), 0);
    }

    #[test]
    fn test_child_path_and_depth() {
        let parent = folder("Reports", "/Reports", 0);
        assert_eq!(Folder::path_under(Some(&parent), "2024"), "/Reports/2024");
        assert_eq!(Folder::depth_under(Some(&parent)), 1);
    }
}
