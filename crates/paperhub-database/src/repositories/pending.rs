//! Pending upload repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use paperhub_core::result::AppResult;
use paperhub_entity::file::{CreateFile, CreatePendingUpload, File, PendingUpload};

use super::db_error;

/// Persistence for the pending upload ledger.
#[async_trait]
pub trait PendingUploadRepository: Send + Sync + 'static {
    /// Record an issued upload.
    async fn create(&self, data: &CreatePendingUpload) -> AppResult<PendingUpload>;

    /// Find a pending upload by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<PendingUpload>>;

    /// Create the file row and remove the pending row in one transaction.
    ///
    /// Returns `None` when the pending row no longer exists, e.g. because a
    /// concurrent confirm already consumed it.
    async fn promote(&self, id: Uuid, file: &CreateFile) -> AppResult<Option<File>>;

    /// Remove a pending upload.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Pending uploads that expired before `cutoff`.
    async fn list_expired(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<PendingUpload>>;
}

/// PostgreSQL pending upload repository.
#[derive(Debug, Clone)]
pub struct PgPendingUploadRepository {
    pool: PgPool,
}

impl PgPendingUploadRepository {
    /// Create a new pending upload repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingUploadRepository for PgPendingUploadRepository {
    async fn create(&self, data: &CreatePendingUpload) -> AppResult<PendingUpload> {
        sqlx::query_as::<_, PendingUpload>(
            "INSERT INTO pending_uploads \
             (id, user_id, workspace_id, folder_id, filename, file_size, content_type, storage_path, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(data.id)
        .bind(data.user_id)
        .bind(data.workspace_id)
        .bind(data.folder_id)
        .bind(&data.filename)
        .bind(data.file_size)
        .bind(&data.content_type)
        .bind(&data.storage_path)
        .bind(data.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to record pending upload"))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<PendingUpload>> {
        sqlx::query_as::<_, PendingUpload>("SELECT * FROM pending_uploads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find pending upload"))
    }

    async fn promote(&self, id: Uuid, file: &CreateFile) -> AppResult<Option<File>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let created = sqlx::query_as::<_, File>(
            "INSERT INTO files \
             (user_id, workspace_id, folder_id, filename, original_filename, storage_path, \
              mime_type, file_size, page_count, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'uploaded') RETURNING *",
        )
        .bind(file.user_id)
        .bind(file.workspace_id)
        .bind(file.folder_id)
        .bind(&file.filename)
        .bind(&file.original_filename)
        .bind(&file.storage_path)
        .bind(&file.mime_type)
        .bind(file.file_size)
        .bind(file.page_count)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to create file"))?;

        let removed = sqlx::query("DELETE FROM pending_uploads WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to remove pending upload"))?;

        if removed.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(db_error("Failed to roll back confirm"))?;
            return Ok(None);
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit confirm"))?;
        Ok(Some(created))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM pending_uploads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete pending upload"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_expired(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<PendingUpload>> {
        sqlx::query_as::<_, PendingUpload>(
            "SELECT * FROM pending_uploads WHERE expires_at < $1 ORDER BY expires_at ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list expired uploads"))
    }
}
