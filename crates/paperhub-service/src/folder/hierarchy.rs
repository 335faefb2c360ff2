//! Arena index over one scope's folders.
//!
//! Subtree walks use an explicit worklist over a parent-id index, so deep
//! hierarchies never recurse.

use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use paperhub_entity::folder::Folder;
use paperhub_entity::folder::model::PATH_SEPARATOR;

/// Folders of one scope, indexed by id and by parent.
#[derive(Debug, Clone)]
pub(crate) struct FolderIndex {
    folders: Vec<Folder>,
    by_id: HashMap<Uuid, usize>,
    children: HashMap<Uuid, Vec<usize>>,
}

impl FolderIndex {
    pub(crate) fn new(folders: Vec<Folder>) -> Self {
        let by_id: HashMap<Uuid, usize> = folders
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.id, idx))
            .collect();

        let mut children: HashMap<Uuid, Vec<usize>> = HashMap::new();
        for (idx, folder) in folders.iter().enumerate() {
            if let Some(parent_id) = folder.parent_id {
                children.entry(parent_id).or_default().push(idx);
            }
        }

        Self {
            folders,
            by_id,
            children,
        }
    }

    pub(crate) fn get(&self, id: Uuid) -> Option<&Folder> {
        self.by_id.get(&id).map(|&idx| &self.folders[idx])
    }

    /// Arena positions of `root` and all its descendants, parents before
    /// children. Empty when `root` is not indexed.
    fn subtree(&self, root: Uuid) -> Vec<usize> {
        let Some(&root_idx) = self.by_id.get(&root) else {
            return Vec::new();
        };

        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([root_idx]);
        while let Some(idx) = queue.pop_front() {
            if !seen.insert(idx) {
                continue;
            }
            order.push(idx);
            if let Some(kids) = self.children.get(&self.folders[idx].id) {
                queue.extend(kids.iter().copied());
            }
        }
        order
    }

    /// Whether `candidate` is `root` or one of its descendants.
    pub(crate) fn contains_in_subtree(&self, root: Uuid, candidate: Uuid) -> bool {
        self.subtree(root)
            .into_iter()
            .any(|idx| self.folders[idx].id == candidate)
    }

    /// Place `root` under `parent` with a new name and sort order, then
    /// recompute path and depth for the whole subtree.
    ///
    /// Returns the changed rows, `root` first.
    pub(crate) fn relocate(
        &mut self,
        root: Uuid,
        parent: Option<Uuid>,
        name: &str,
        sort_order: i32,
    ) -> Vec<Folder> {
        let order = self.subtree(root);
        let Some(&root_idx) = order.first() else {
            return Vec::new();
        };

        let parent_folder = parent.and_then(|id| self.get(id)).cloned();
        {
            let folder = &mut self.folders[root_idx];
            folder.parent_id = parent;
            folder.name = name.to_string();
            folder.sort_order = sort_order;
            folder.path = Folder::path_under(parent_folder.as_ref(), name);
            folder.depth = Folder::depth_under(parent_folder.as_ref());
        }

        for &idx in order.iter().skip(1) {
            let Some(parent_idx) = self.folders[idx]
                .parent_id
                .and_then(|id| self.by_id.get(&id).copied())
            else {
                continue;
            };
            let (parent_path, parent_depth) = {
                let p = &self.folders[parent_idx];
                (p.path.clone(), p.depth)
            };
            let folder = &mut self.folders[idx];
            folder.path = format!("{parent_path}{PATH_SEPARATOR}{}", folder.name);
            folder.depth = parent_depth + 1;
        }

        order
            .into_iter()
            .map(|idx| self.folders[idx].clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn folder(id: Uuid, parent: Option<&Folder>, name: &str) -> Folder {
        Folder {
            id,
            user_id: Uuid::nil(),
            workspace_id: None,
            parent_id: parent.map(|p| p.id),
            name: name.to_string(),
            path: Folder::path_under(parent, name),
            depth: Folder::depth_under(parent),
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample() -> (FolderIndex, Uuid, Uuid, Uuid, Uuid) {
        let reports = folder(Uuid::new_v4(), None, "Reports");
        let year = folder(Uuid::new_v4(), Some(&reports), "2024");
        let q1 = folder(Uuid::new_v4(), Some(&year), "Q1");
        let archive = folder(Uuid::new_v4(), None, "Archive");
        let ids = (reports.id, year.id, q1.id, archive.id);
        (
            FolderIndex::new(vec![reports, year, q1, archive]),
            ids.0,
            ids.1,
            ids.2,
            ids.3,
        )
    }

    #[test]
    fn test_subtree_includes_root_and_descendants() {
        let (index, reports, year, q1, archive) = sample();
        let ids: Vec<Uuid> = index
            .subtree(reports)
            .into_iter()
            .map(|idx| index.folders[idx].id)
            .collect();
        assert_eq!(ids, vec![reports, year, q1]);
        assert!(index.contains_in_subtree(reports, q1));
        assert!(!index.contains_in_subtree(reports, archive));
        assert!(index.subtree(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn test_relocate_recomputes_paths_and_depths() {
        let (mut index, _, year, q1, archive) = sample();
        let changed = index.relocate(year, Some(archive), "2024", 3);
        assert_eq!(changed.len(), 2);
        assert_eq!(changed[0].path, "/Archive/2024");
        assert_eq!(changed[0].depth, 1);
        assert_eq!(changed[0].sort_order, 3);
        assert_eq!(changed[1].id, q1);
        assert_eq!(changed[1].path, "/Archive/2024/Q1");
        assert_eq!(changed[1].depth, 2);
    }

    #[test]
    fn test_rename_in_place_propagates() {
        let (mut index, reports, _, q1, _) = sample();
        let changed = index.relocate(reports, None, "Papers", 0);
        assert_eq!(changed[0].path, "/Papers");
        assert_eq!(index.get(q1).unwrap().path, "/Papers/2024/Q1");
    }
}
