//! Folder CRUD with cascading moves, renames and deletes.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_core::traits::{Bucket, ObjectStorage};
use paperhub_database::repositories::FolderRepository;
use paperhub_entity::OwnerScope;
use paperhub_entity::folder::{CreateFolder, Folder, FolderWithStats};
use paperhub_entity::folder::model::PATH_SEPARATOR;

use super::hierarchy::FolderIndex;
use crate::access::WorkspaceAccess;
use crate::context::RequestContext;
use crate::locks::KeyedLocks;

/// Manages the folder hierarchy of each scope.
#[derive(Clone)]
pub struct FolderService {
    /// Folder repository.
    folders: Arc<dyn FolderRepository>,
    /// Object storage, for removing the files of deleted folders.
    storage: Arc<dyn ObjectStorage>,
    /// Access filter.
    access: WorkspaceAccess,
    /// Serializes hierarchy changes within one scope.
    scope_locks: Arc<KeyedLocks<OwnerScope>>,
}

impl std::fmt::Debug for FolderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderService")
            .field("storage", &self.storage.provider_type())
            .field("locked_scopes", &self.scope_locks.len())
            .finish()
    }
}

/// Request to create a folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Folder name.
    #[validate(custom(function = "validate_folder_name"))]
    pub name: String,
    /// Parent folder (`None` for a root folder).
    pub parent_id: Option<Uuid>,
    /// Position among siblings.
    pub sort_order: Option<i32>,
}

/// Request to rename a folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenameFolderRequest {
    /// New folder name.
    #[validate(custom(function = "validate_folder_name"))]
    pub name: String,
}

/// Request to move a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveFolderRequest {
    /// New parent folder (`None` moves to the root).
    pub parent_id: Option<Uuid>,
    /// New position among siblings; unchanged when absent.
    pub sort_order: Option<i32>,
}

/// Outcome of a cascading folder delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderDeletion {
    /// Folders removed, including the target.
    pub folders_deleted: u64,
    /// Files removed from the database.
    pub files_deleted: u64,
    /// Backing objects whose removal failed and were left behind.
    pub objects_failed: u64,
}

fn validate_folder_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 255 {
        return Err(ValidationError::new("length")
            .with_message("Folder name must be 1 to 255 characters".into()));
    }
    if trimmed.contains(PATH_SEPARATOR) {
        return Err(ValidationError::new("separator")
            .with_message("Folder name cannot contain '/'".into()));
    }
    Ok(())
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(
        folders: Arc<dyn FolderRepository>,
        storage: Arc<dyn ObjectStorage>,
        access: WorkspaceAccess,
    ) -> Self {
        Self {
            folders,
            storage,
            access,
            scope_locks: Arc::new(KeyedLocks::new()),
        }
    }

    /// Creates a folder in the caller's effective scope.
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        req: CreateFolderRequest,
    ) -> AppResult<Folder> {
        req.validate()?;
        let name = req.name.trim().to_string();
        let scope = self.access.resolve_scope(ctx).await?;
        let _guard = self.scope_locks.acquire(scope).await;

        let parent = match req.parent_id {
            Some(parent_id) => Some(
                self.folders
                    .find_by_id(parent_id)
                    .await?
                    .filter(|p| p.in_scope(&scope))
                    .ok_or_else(|| AppError::not_found("Parent folder not found"))?,
            ),
            None => None,
        };

        let record = CreateFolder {
            user_id: ctx.user_id,
            workspace_id: scope.workspace_id(),
            parent_id: req.parent_id,
            path: Folder::path_under(parent.as_ref(), &name),
            depth: Folder::depth_under(parent.as_ref()),
            sort_order: req.sort_order.unwrap_or(0),
            name,
        };

        let folder = self.folders.create(&record).await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder.id,
            path = %folder.path,
            "Folder created"
        );

        Ok(folder)
    }

    /// Every folder of the caller's effective scope with direct file stats.
    pub async fn list_folders(&self, ctx: &RequestContext) -> AppResult<Vec<FolderWithStats>> {
        let scope = self.access.resolve_scope(ctx).await?;
        let folders = self.folders.list_by_scope(&scope).await?;
        let stats: HashMap<Uuid, (i64, i64)> = self
            .folders
            .stats_by_scope(&scope)
            .await?
            .into_iter()
            .map(|s| (s.folder_id, (s.file_count, s.total_size)))
            .collect();

        Ok(folders
            .into_iter()
            .map(|folder| {
                let (file_count, total_size) = stats.get(&folder.id).copied().unwrap_or((0, 0));
                FolderWithStats {
                    folder,
                    file_count,
                    total_size,
                }
            })
            .collect())
    }

    /// One folder with its direct file stats.
    pub async fn get_folder(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
    ) -> AppResult<FolderWithStats> {
        let folder = self.load(ctx, folder_id).await?;
        let scope = OwnerScope::of(folder.user_id, folder.workspace_id);
        let (file_count, total_size) = self
            .folders
            .stats_by_scope(&scope)
            .await?
            .into_iter()
            .find(|s| s.folder_id == folder_id)
            .map(|s| (s.file_count, s.total_size))
            .unwrap_or((0, 0));

        Ok(FolderWithStats {
            folder,
            file_count,
            total_size,
        })
    }

    /// Renames a folder and rewrites the paths of its descendants.
    pub async fn rename_folder(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
        req: RenameFolderRequest,
    ) -> AppResult<Folder> {
        req.validate()?;
        let name = req.name.trim().to_string();
        let (_guard, mut index, folder) = self.lock_hierarchy(ctx, folder_id).await?;

        let changed = index.relocate(folder_id, folder.parent_id, &name, folder.sort_order);
        self.folders.update_subtree(&changed).await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            old_name = %folder.name,
            new_name = %name,
            descendants = changed.len().saturating_sub(1),
            "Folder renamed"
        );

        changed
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Folder not found"))
    }

    /// Moves a folder under a new parent (or to the root).
    ///
    /// The target must be in the same scope and may not be the folder
    /// itself or one of its descendants.
    pub async fn move_folder(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
        req: MoveFolderRequest,
    ) -> AppResult<Folder> {
        let (_guard, mut index, folder) = self.lock_hierarchy(ctx, folder_id).await?;

        if let Some(parent_id) = req.parent_id {
            if index.get(parent_id).is_none() {
                return Err(AppError::not_found("Target folder not found"));
            }
            if index.contains_in_subtree(folder_id, parent_id) {
                return Err(AppError::invalid_field(
                    "parent_id",
                    "Cannot move a folder into itself or one of its subfolders",
                ));
            }
        }

        let sort_order = req.sort_order.unwrap_or(folder.sort_order);
        let changed = index.relocate(folder_id, req.parent_id, &folder.name, sort_order);
        self.folders.update_subtree(&changed).await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            parent_id = ?req.parent_id,
            moved = changed.len(),
            "Folder moved"
        );

        changed
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found("Folder not found"))
    }

    /// Deletes a folder, its descendants and every file inside them.
    ///
    /// Rows go in one transaction; backing objects are removed afterwards
    /// and failures there are only logged.
    pub async fn delete_folder(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
    ) -> AppResult<FolderDeletion> {
        let folder = self.load(ctx, folder_id).await?;
        let _guard = self
            .scope_locks
            .acquire(OwnerScope::of(folder.user_id, folder.workspace_id))
            .await;

        let deleted = self.folders.delete_cascade(folder_id).await?;

        let mut objects_failed = 0;
        for file in &deleted.files {
            if let Err(e) = self.storage.delete(Bucket::Files, &file.storage_path).await {
                objects_failed += 1;
                warn!(
                    file_id = %file.id,
                    storage_path = %file.storage_path,
                    error = %e,
                    "Failed to delete object of removed file"
                );
            }
        }

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder_id,
            folders = deleted.folders_deleted,
            files = deleted.files.len(),
            objects_failed,
            "Folder deleted"
        );

        Ok(FolderDeletion {
            folders_deleted: deleted.folders_deleted,
            files_deleted: deleted.files.len() as u64,
            objects_failed,
        })
    }

    /// Load a folder the caller may act on.
    async fn load(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<Folder> {
        let folder = self
            .folders
            .find_by_id(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder not found"))?;
        self.access
            .ensure_access(ctx, folder.user_id, folder.workspace_id, "Folder not found")
            .await?;
        Ok(folder)
    }

    /// Take the scope lock of a folder the caller may act on, then index
    /// the scope and re-read the folder from that index.
    async fn lock_hierarchy(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
    ) -> AppResult<(OwnedMutexGuard<()>, FolderIndex, Folder)> {
        let loaded = self.load(ctx, folder_id).await?;
        let scope = OwnerScope::of(loaded.user_id, loaded.workspace_id);
        let guard = self.scope_locks.acquire(scope).await;

        let index = FolderIndex::new(self.folders.list_by_scope(&scope).await?);
        let folder = index
            .get(folder_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Folder not found"))?;
        Ok((guard, index, folder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_name_rules() {
        assert!(validate_folder_name("Reports").is_ok());
        assert!(validate_folder_name("  ").is_err());
        assert!(validate_folder_name("a/b").is_err());
        assert!(validate_folder_name(&"x".repeat(256)).is_err());
        assert!(validate_folder_name(&"x".repeat(255)).is_ok());
    }
}
