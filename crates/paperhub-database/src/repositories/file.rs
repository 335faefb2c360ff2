//! File repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_core::types::PageResponse;
use paperhub_entity::OwnerScope;
use paperhub_entity::file::{
    ExportRow, File, FileFilter, FileListItem, FileQuery, ProcessingStatus,
};

use super::{db_error, scope_predicate};

/// Persistence for file rows.
#[async_trait]
pub trait FileRepository: Send + Sync + 'static {
    /// Find a file by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>>;

    /// Filtered, sorted, paginated listing.
    async fn list(&self, query: &FileQuery) -> AppResult<PageResponse<FileListItem>>;

    /// Every file in a scope, for embedding into the folder tree.
    async fn list_by_scope(&self, scope: &OwnerScope) -> AppResult<Vec<FileListItem>>;

    /// Move a file to another folder (or the root).
    async fn set_folder(&self, id: Uuid, folder_id: Option<Uuid>) -> AppResult<File>;

    /// Change the stored and display filename.
    async fn rename(&self, id: Uuid, filename: &str, original_filename: &str) -> AppResult<File>;

    /// Compare-and-set the processing status.
    ///
    /// Returns `false` without writing when the current status is not in
    /// `from`. Moving to `pending` clears the previous error message.
    async fn transition_status(
        &self,
        id: Uuid,
        from: &[ProcessingStatus],
        to: ProcessingStatus,
    ) -> AppResult<bool>;

    /// Delete a file row (summaries and jobs cascade).
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Export rows: one per (file, summary version), newest first.
    ///
    /// When `ids` is given the other filters are ignored, but rows stay
    /// restricted to `scope`.
    async fn export(
        &self,
        scope: &OwnerScope,
        filter: &FileFilter,
        ids: Option<&[Uuid]>,
    ) -> AppResult<Vec<ExportRow>>;
}

/// PostgreSQL file repository.
#[derive(Debug, Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const LIST_COLUMNS: &str = "f.id, f.filename, f.original_filename, f.folder_id, f.file_size, \
     f.page_count, f.status, \
     EXISTS (SELECT 1 FROM summaries s WHERE s.file_id = f.id AND s.is_current) AS has_summary, \
     f.uploaded_at, f.processed_at";

/// Optional folder/status/search filter over `files f`.
fn filter_predicate(folder: usize, status: usize, search: usize) -> String {
    format!(
        "(${folder}::uuid IS NULL OR f.folder_id = ${folder}) \
         AND (${status}::processing_status IS NULL OR f.status = ${status}) \
         AND (${search}::text IS NULL OR f.filename ILIKE ${search} OR f.original_filename ILIKE ${search})"
    )
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find file"))
    }

    async fn list(&self, query: &FileQuery) -> AppResult<PageResponse<FileListItem>> {
        let (user_id, workspace_id) = query.scope.sql_binds();
        let search = query.filter.search_pattern();
        let predicate = format!(
            "{} AND {}",
            scope_predicate("f", 1, 2),
            filter_predicate(3, 4, 5)
        );

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM files f WHERE {predicate}"))
            .bind(user_id)
            .bind(workspace_id)
            .bind(query.filter.folder_id)
            .bind(query.filter.status)
            .bind(search.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count files"))?;

        let sql = format!(
            "SELECT {LIST_COLUMNS} FROM files f WHERE {predicate} ORDER BY {} LIMIT $6 OFFSET $7",
            query.sort.order_by_sql()
        );
        let items = sqlx::query_as::<_, FileListItem>(&sql)
            .bind(user_id)
            .bind(workspace_id)
            .bind(query.filter.folder_id)
            .bind(query.filter.status)
            .bind(search.as_deref())
            .bind(i64::try_from(query.page.limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(query.page.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list files"))?;

        Ok(PageResponse::new(items, &query.page, total as u64))
    }

    async fn list_by_scope(&self, scope: &OwnerScope) -> AppResult<Vec<FileListItem>> {
        let (user_id, workspace_id) = scope.sql_binds();
        let sql = format!(
            "SELECT {LIST_COLUMNS} FROM files f WHERE {} ORDER BY f.filename ASC",
            scope_predicate("f", 1, 2)
        );
        sqlx::query_as::<_, FileListItem>(&sql)
            .bind(user_id)
            .bind(workspace_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list files for tree"))
    }

    async fn set_folder(&self, id: Uuid, folder_id: Option<Uuid>) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET folder_id = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(folder_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to move file"))?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    async fn rename(&self, id: Uuid, filename: &str, original_filename: &str) -> AppResult<File> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET filename = $2, original_filename = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(filename)
        .bind(original_filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to rename file"))?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: &[ProcessingStatus],
        to: ProcessingStatus,
    ) -> AppResult<bool> {
        let from: Vec<&str> = from.iter().map(ProcessingStatus::as_str).collect();
        let result = sqlx::query(
            "UPDATE files SET status = $2, \
             error_message = CASE WHEN $2 = 'pending'::processing_status THEN NULL ELSE error_message END, \
             updated_at = NOW() \
             WHERE id = $1 AND status::text = ANY($3)",
        )
        .bind(id)
        .bind(to)
        .bind(&from)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update file status"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete file"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn export(
        &self,
        scope: &OwnerScope,
        filter: &FileFilter,
        ids: Option<&[Uuid]>,
    ) -> AppResult<Vec<ExportRow>> {
        let (user_id, workspace_id) = scope.sql_binds();
        let sql = format!(
            "SELECT f.id, f.filename, f.original_filename, f.file_size, f.page_count, f.mime_type, \
             f.uploaded_at, f.created_at, f.status, \
             COALESCE(fo.path, '/') AS folder_path, COALESCE(w.name, 'Personal') AS workspace_name, \
             s.version AS summary_version, s.model_used AS summary_model, \
             s.created_at AS summary_created_at, s.processing_duration_ms AS summary_duration_ms, \
             s.content AS summary_content \
             FROM files f \
             LEFT JOIN folders fo ON fo.id = f.folder_id \
             LEFT JOIN workspaces w ON w.id = f.workspace_id \
             LEFT JOIN summaries s ON s.file_id = f.id \
             WHERE {} AND (($3::uuid[] IS NOT NULL AND f.id = ANY($3)) OR ($3::uuid[] IS NULL AND {})) \
             ORDER BY f.created_at DESC, f.id ASC, s.version DESC NULLS LAST",
            scope_predicate("f", 1, 2),
            filter_predicate(4, 5, 6)
        );
        let search = filter.search_pattern();
        sqlx::query_as::<_, ExportRow>(&sql)
            .bind(user_id)
            .bind(workspace_id)
            .bind(ids)
            .bind(filter.folder_id)
            .bind(filter.status)
            .bind(search.as_deref())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to export files"))
    }
}
