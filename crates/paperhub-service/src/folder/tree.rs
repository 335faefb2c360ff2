//! Folder tree building.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use paperhub_core::result::AppResult;
use paperhub_database::repositories::{FileRepository, FolderRepository};
use paperhub_entity::file::FileListItem;
use paperhub_entity::folder::{Folder, FolderNode, FolderStats, FolderTree};

use crate::access::WorkspaceAccess;
use crate::context::RequestContext;

/// What to embed in a folder tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeOptions {
    /// Embed each folder's immediate files.
    #[serde(default)]
    pub include_files: bool,
    /// Annotate each folder with its file count and total size.
    #[serde(default)]
    pub include_counts: bool,
}

/// Builds folder trees for a scope.
#[derive(Clone)]
pub struct TreeService {
    /// Folder repository.
    folders: Arc<dyn FolderRepository>,
    /// File repository.
    files: Arc<dyn FileRepository>,
    /// Access filter.
    access: WorkspaceAccess,
}

impl std::fmt::Debug for TreeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeService").finish()
    }
}

impl TreeService {
    /// Creates a new tree service.
    pub fn new(
        folders: Arc<dyn FolderRepository>,
        files: Arc<dyn FileRepository>,
        access: WorkspaceAccess,
    ) -> Self {
        Self {
            folders,
            files,
            access,
        }
    }

    /// The complete folder forest of the caller's effective scope.
    pub async fn get_tree(
        &self,
        ctx: &RequestContext,
        options: TreeOptions,
    ) -> AppResult<FolderTree> {
        let scope = self.access.resolve_scope(ctx).await?;
        let folders = self.folders.list_by_scope(&scope).await?;

        let stats = if options.include_counts {
            Some(self.folders.stats_by_scope(&scope).await?)
        } else {
            None
        };

        let files = if options.include_files {
            Some(self.files.list_by_scope(&scope).await?)
        } else {
            None
        };

        let tree = build_tree(folders, stats, files);
        debug!(
            user_id = %ctx.user_id,
            total_folders = tree.total_folders,
            roots = tree.roots.len(),
            "Folder tree built"
        );
        Ok(tree)
    }
}

/// Link a flat folder list into a forest in time linear in its size.
///
/// The first pass indexes folders by id and groups them under their
/// parent; the second walks from the roots with an explicit stack. A folder
/// whose parent is missing from the list becomes a root. Children are
/// ordered by `(sort_order, name)`.
pub fn build_tree(
    folders: Vec<Folder>,
    stats: Option<Vec<FolderStats>>,
    files: Option<Vec<FileListItem>>,
) -> FolderTree {
    let total_folders = folders.len() as u64;

    let stats: Option<HashMap<Uuid, FolderStats>> =
        stats.map(|s| s.into_iter().map(|row| (row.folder_id, row)).collect());

    let mut root_files = files.as_ref().map(|_| Vec::new());
    let mut files_by_folder: Option<HashMap<Uuid, Vec<FileListItem>>> =
        files.as_ref().map(|_| HashMap::new());
    if let (Some(files), Some(grouped)) = (files, files_by_folder.as_mut()) {
        for file in files {
            match file.folder_id {
                Some(folder_id) => grouped.entry(folder_id).or_default().push(file),
                None => {
                    if let Some(root) = root_files.as_mut() {
                        root.push(file);
                    }
                }
            }
        }
    }

    // Pass one: arena and parent index.
    let by_id: HashMap<Uuid, usize> = folders
        .iter()
        .enumerate()
        .map(|(idx, f)| (f.id, idx))
        .collect();
    let mut child_idx: Vec<Vec<usize>> = vec![Vec::new(); folders.len()];
    let mut root_idx = Vec::new();
    for (idx, folder) in folders.iter().enumerate() {
        match folder.parent_id.and_then(|p| by_id.get(&p).copied()) {
            Some(parent) if parent != idx => child_idx[parent].push(idx),
            _ => root_idx.push(idx),
        }
    }

    let mut nodes: Vec<Option<FolderNode>> = folders
        .into_iter()
        .map(|folder| {
            let folder_stats = stats.as_ref().map(|s| s.get(&folder.id));
            let embedded = files_by_folder
                .as_mut()
                .map(|grouped| grouped.remove(&folder.id).unwrap_or_default());
            Some(FolderNode {
                id: folder.id,
                name: folder.name,
                path: folder.path,
                parent_id: folder.parent_id,
                depth: folder.depth,
                sort_order: folder.sort_order,
                file_count: folder_stats.map(|s| s.map(|s| s.file_count).unwrap_or(0)),
                total_size: folder_stats.map(|s| s.map(|s| s.total_size).unwrap_or(0)),
                created_at: folder.created_at,
                children: Vec::new(),
                files: embedded,
            })
        })
        .collect();

    // Pass two: pre-order walk recording who reached each node, then
    // attach in reverse so every child is complete before its parent takes
    // it. Nodes unreachable from a root (a parent cycle) are walked last as
    // roots of their own.
    let mut order = Vec::with_capacity(nodes.len());
    let mut reached_from: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut visited = vec![false; nodes.len()];
    let mut stack: Vec<(usize, Option<usize>)> =
        root_idx.iter().rev().map(|&idx| (idx, None)).collect();
    let mut next_unvisited = 0;
    loop {
        let Some((idx, parent)) = stack.pop() else {
            while next_unvisited < visited.len() && visited[next_unvisited] {
                next_unvisited += 1;
            }
            if next_unvisited == visited.len() {
                break;
            }
            stack.push((next_unvisited, None));
            continue;
        };
        if std::mem::replace(&mut visited[idx], true) {
            continue;
        }
        reached_from[idx] = parent;
        order.push(idx);
        stack.extend(child_idx[idx].iter().map(|&kid| (kid, Some(idx))));
    }

    let mut built: Vec<Vec<FolderNode>> = vec![Vec::new(); nodes.len()];
    let mut roots = Vec::new();
    for &idx in order.iter().rev() {
        let Some(mut node) = nodes[idx].take() else {
            continue;
        };
        let mut children = std::mem::take(&mut built[idx]);
        sort_siblings(&mut children);
        node.children = children;
        match reached_from[idx] {
            Some(parent) => built[parent].push(node),
            None => roots.push(node),
        }
    }
    sort_siblings(&mut roots);

    FolderTree {
        roots,
        total_folders,
        root_files,
    }
}

fn sort_siblings(nodes: &mut [FolderNode]) {
    nodes.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| a.name.cmp(&b.name))
    });
}
