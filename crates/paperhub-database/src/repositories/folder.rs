//! Folder repository.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_entity::OwnerScope;
use paperhub_entity::file::File;
use paperhub_entity::folder::{CreateFolder, Folder, FolderStats};

use super::{db_error, scope_predicate};

/// Rows removed by a cascading folder delete.
#[derive(Debug, Clone, Default)]
pub struct CascadeDelete {
    /// Number of folder rows removed.
    pub folders_deleted: u64,
    /// File rows removed, so their objects can be cleaned up.
    pub files: Vec<File>,
}

/// Persistence for the folder hierarchy.
#[async_trait]
pub trait FolderRepository: Send + Sync + 'static {
    /// Find a folder by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>>;

    /// Every folder in a scope, shallowest first.
    async fn list_by_scope(&self, scope: &OwnerScope) -> AppResult<Vec<Folder>>;

    /// Direct file statistics for every non-empty folder in a scope.
    async fn stats_by_scope(&self, scope: &OwnerScope) -> AppResult<Vec<FolderStats>>;

    /// Insert a folder.
    async fn create(&self, data: &CreateFolder) -> AppResult<Folder>;

    /// Persist name, parent, path, depth and sort order of several folders
    /// in one transaction.
    ///
    /// All folders belong to one scope. The write fails with a validation
    /// error on `parent_id` if any folder would become its own ancestor.
    async fn update_subtree(&self, folders: &[Folder]) -> AppResult<()>;

    /// Delete a folder, every descendant and every file inside them in one
    /// transaction. The subtree is resolved inside that transaction.
    async fn delete_cascade(&self, folder_id: Uuid) -> AppResult<CascadeDelete>;
}

/// PostgreSQL folder repository.
#[derive(Debug, Clone)]
pub struct PgFolderRepository {
    pool: PgPool,
}

impl PgFolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FolderRepository for PgFolderRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find folder"))
    }

    async fn list_by_scope(&self, scope: &OwnerScope) -> AppResult<Vec<Folder>> {
        let (user_id, workspace_id) = scope.sql_binds();
        let sql = format!(
            "SELECT * FROM folders fo WHERE {} ORDER BY depth ASC, sort_order ASC, name ASC",
            scope_predicate("fo", 1, 2)
        );
        sqlx::query_as::<_, Folder>(&sql)
            .bind(user_id)
            .bind(workspace_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list folders"))
    }

    async fn stats_by_scope(&self, scope: &OwnerScope) -> AppResult<Vec<FolderStats>> {
        let (user_id, workspace_id) = scope.sql_binds();
        let sql = format!(
            "SELECT f.folder_id AS folder_id, COUNT(*)::BIGINT AS file_count, \
             COALESCE(SUM(f.file_size), 0)::BIGINT AS total_size \
             FROM files f WHERE f.folder_id IS NOT NULL AND {} GROUP BY f.folder_id",
            scope_predicate("f", 1, 2)
        );
        sqlx::query_as::<_, FolderStats>(&sql)
            .bind(user_id)
            .bind(workspace_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to aggregate folder statistics"))
    }

    async fn create(&self, data: &CreateFolder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (user_id, workspace_id, parent_id, name, path, depth, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.workspace_id)
        .bind(data.parent_id)
        .bind(&data.name)
        .bind(&data.path)
        .bind(data.depth)
        .bind(data.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create folder"))
    }

    async fn update_subtree(&self, folders: &[Folder]) -> AppResult<()> {
        let Some(first) = folders.first() else {
            return Ok(());
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        lock_scope(&mut tx, &OwnerScope::of(first.user_id, first.workspace_id)).await?;

        for folder in folders {
            let result = sqlx::query(
                "UPDATE folders SET parent_id = $2, name = $3, path = $4, depth = $5, \
                 sort_order = $6, updated_at = NOW() WHERE id = $1",
            )
            .bind(folder.id)
            .bind(folder.parent_id)
            .bind(&folder.name)
            .bind(&folder.path)
            .bind(folder.depth)
            .bind(folder.sort_order)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to update folder"))?;

            if result.rows_affected() == 0 {
                return Err(AppError::not_found(format!("Folder {} not found", folder.id)));
            }
        }

        let ids: Vec<Uuid> = folders.iter().map(|f| f.id).collect();
        let cyclic: bool = sqlx::query_scalar(
            "WITH RECURSIVE ancestors(origin, id, parent_id) AS ( \
                 SELECT id, id, parent_id FROM folders WHERE id = ANY($1) \
                 UNION \
                 SELECT a.origin, f.id, f.parent_id FROM folders f \
                 JOIN ancestors a ON f.id = a.parent_id \
             ) \
             SELECT EXISTS (SELECT 1 FROM ancestors WHERE parent_id = origin)",
        )
        .bind(&ids)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to verify folder ancestry"))?;

        if cyclic {
            return Err(AppError::invalid_field(
                "parent_id",
                "Cannot move a folder into itself or one of its subfolders",
            ));
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit folder update"))
    }

    async fn delete_cascade(&self, folder_id: Uuid) -> AppResult<CascadeDelete> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let Some(root) = sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(folder_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to find folder"))?
        else {
            return Ok(CascadeDelete::default());
        };

        lock_scope(&mut tx, &OwnerScope::of(root.user_id, root.workspace_id)).await?;

        let folder_ids: Vec<Uuid> = sqlx::query_scalar(
            "WITH RECURSIVE subtree(id) AS ( \
                 SELECT id FROM folders WHERE id = $1 \
                 UNION \
                 SELECT f.id FROM folders f JOIN subtree s ON f.parent_id = s.id \
             ) \
             SELECT id FROM subtree",
        )
        .bind(folder_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("Failed to resolve folder subtree"))?;

        let files = sqlx::query_as::<_, File>(
            "DELETE FROM files WHERE folder_id = ANY($1) RETURNING *",
        )
        .bind(&folder_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("Failed to delete folder files"))?;

        sqlx::query("DELETE FROM pending_uploads WHERE folder_id = ANY($1)")
            .bind(&folder_ids)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete folder uploads"))?;

        let folders = sqlx::query("DELETE FROM folders WHERE id = ANY($1)")
            .bind(&folder_ids)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete folders"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit folder delete"))?;

        Ok(CascadeDelete {
            folders_deleted: folders.rows_affected(),
            files,
        })
    }
}

/// Row-lock every folder of a scope until the transaction ends.
///
/// Inserts referencing a locked folder (new children, confirmed files)
/// wait on the same rows, so hierarchy changes in one scope serialize.
async fn lock_scope(conn: &mut PgConnection, scope: &OwnerScope) -> AppResult<()> {
    let (user_id, workspace_id) = scope.sql_binds();
    let sql = format!(
        "SELECT fo.id FROM folders fo WHERE {} FOR UPDATE",
        scope_predicate("fo", 1, 2)
    );
    sqlx::query(&sql)
        .bind(user_id)
        .bind(workspace_id)
        .execute(conn)
        .await
        .map_err(db_error("Failed to lock folders"))?;
    Ok(())
}
