//! Summary repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use paperhub_core::result::AppResult;
use paperhub_entity::summary::{NewSummary, Summary};

use super::db_error;

/// Persistence for summary versions.
#[async_trait]
pub trait SummaryRepository: Send + Sync + 'static {
    /// Apply a successful attempt atomically.
    ///
    /// Ends the live job `job_id` as `done`, stores `summary` as version
    /// `max + 1` and the only current row, and marks the file `completed`.
    /// Returns `None` without writing when `job_id` is not a live job of
    /// the file.
    async fn finalize_success(&self, job_id: Uuid, summary: &NewSummary)
    -> AppResult<Option<Summary>>;

    /// The current summary of a file.
    async fn find_current(&self, file_id: Uuid) -> AppResult<Option<Summary>>;

    /// A specific version of a file's summary.
    async fn find_version(&self, file_id: Uuid, version: i32) -> AppResult<Option<Summary>>;

    /// Every version of a file's summary, newest first.
    async fn history(&self, file_id: Uuid) -> AppResult<Vec<Summary>>;
}

/// PostgreSQL summary repository.
#[derive(Debug, Clone)]
pub struct PgSummaryRepository {
    pool: PgPool,
}

impl PgSummaryRepository {
    /// Create a new summary repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SummaryRepository for PgSummaryRepository {
    async fn finalize_success(
        &self,
        job_id: Uuid,
        summary: &NewSummary,
    ) -> AppResult<Option<Summary>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let closed = sqlx::query(
            "UPDATE processing_jobs SET status = 'done', completed_at = NOW() \
             WHERE id = $1 AND file_id = $2 AND status IN ('queued', 'processing')",
        )
        .bind(job_id)
        .bind(summary.file_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to complete job"))?;

        if closed.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(db_error("Failed to roll back summary"))?;
            return Ok(None);
        }

        // Row lock serializes version assignment per file.
        sqlx::query("SELECT id FROM files WHERE id = $1 FOR UPDATE")
            .bind(summary.file_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to lock file"))?;

        let version: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM summaries WHERE file_id = $1",
        )
        .bind(summary.file_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to compute summary version"))?;

        sqlx::query("UPDATE summaries SET is_current = FALSE WHERE file_id = $1 AND is_current")
            .bind(summary.file_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to retire current summary"))?;

        let stored = sqlx::query_as::<_, Summary>(
            "INSERT INTO summaries \
             (file_id, version, is_current, title, content, style, custom_instructions, model_used, \
              prompt_tokens, completion_tokens, processing_duration_ms, language) \
             VALUES ($1, $2, TRUE, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
        )
        .bind(summary.file_id)
        .bind(version)
        .bind(&summary.title)
        .bind(&summary.content)
        .bind(summary.style)
        .bind(&summary.custom_instructions)
        .bind(&summary.model_used)
        .bind(summary.prompt_tokens)
        .bind(summary.completion_tokens)
        .bind(summary.processing_duration_ms)
        .bind(&summary.language)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to store summary"))?;

        sqlx::query(
            "UPDATE files SET status = 'completed', error_message = NULL, processed_at = NOW(), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(summary.file_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to mark file completed"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit summary"))?;
        Ok(Some(stored))
    }

    async fn find_current(&self, file_id: Uuid) -> AppResult<Option<Summary>> {
        sqlx::query_as::<_, Summary>(
            "SELECT * FROM summaries WHERE file_id = $1 AND is_current LIMIT 1",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find current summary"))
    }

    async fn find_version(&self, file_id: Uuid, version: i32) -> AppResult<Option<Summary>> {
        sqlx::query_as::<_, Summary>("SELECT * FROM summaries WHERE file_id = $1 AND version = $2")
            .bind(file_id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find summary version"))
    }

    async fn history(&self, file_id: Uuid) -> AppResult<Vec<Summary>> {
        sqlx::query_as::<_, Summary>(
            "SELECT * FROM summaries WHERE file_id = $1 ORDER BY version DESC",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list summary history"))
    }
}
