//! Folder tree structures for hierarchical display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::file::FileListItem;

/// A node in a folder tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderNode {
    /// Folder ID.
    pub id: Uuid,
    /// Folder name.
    pub name: String,
    /// Full path.
    pub path: String,
    /// Parent folder ID.
    pub parent_id: Option<Uuid>,
    /// Depth level.
    pub depth: i32,
    /// Sibling ordering.
    pub sort_order: i32,
    /// Number of files directly in this folder, when counts were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_count: Option<i64>,
    /// Total bytes directly in this folder, when counts were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size: Option<i64>,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// Child folder nodes.
    pub children: Vec<FolderNode>,
    /// Files directly in this folder, when files were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileListItem>>,
}

/// The complete folder forest of one scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderTree {
    /// Root nodes, including orphans whose parent is outside the scope.
    pub roots: Vec<FolderNode>,
    /// Total number of folders in the tree.
    pub total_folders: u64,
    /// Files outside any folder, when files were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_files: Option<Vec<FileListItem>>,
}

impl FolderTree {
    /// Create an empty folder tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Depth-first iterator over every node.
    pub fn iter(&self) -> impl Iterator<Item = &FolderNode> {
        let mut stack: Vec<&FolderNode> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Find a node by id.
    pub fn find(&self, id: Uuid) -> Option<&FolderNode> {
        self.iter().find(|n| n.id == id)
    }
}
