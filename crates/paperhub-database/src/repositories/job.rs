//! Processing job repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_entity::job::{CreateJob, ProcessingJob};

use super::{db_error, is_unique_violation};

/// Partial unique index allowing one queued/processing job per file.
pub const ONE_LIVE_JOB_INDEX: &str = "processing_jobs_one_live_per_file";

/// Persistence for processing jobs.
#[async_trait]
pub trait JobRepository: Send + Sync + 'static {
    /// Create a `queued` job.
    ///
    /// Fails with `AlreadyProcessing` if the file already has a live job.
    async fn create(&self, data: &CreateJob) -> AppResult<ProcessingJob>;

    /// Find a job by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ProcessingJob>>;

    /// The queued or processing job of a file, if any.
    async fn find_live_by_file(&self, file_id: Uuid) -> AppResult<Option<ProcessingJob>>;

    /// Move a queued job to `processing`.
    async fn mark_processing(&self, id: Uuid) -> AppResult<bool>;

    /// End a live job in `error` and mark its file `failed`, atomically.
    ///
    /// Returns `false` when the job is already terminal.
    async fn finalize_error(&self, id: Uuid, message: &str) -> AppResult<bool>;

    /// Live jobs created before `cutoff`.
    async fn list_stale(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<ProcessingJob>>;
}

/// PostgreSQL job repository.
#[derive(Debug, Clone)]
pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    /// Create a new job repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn create(&self, data: &CreateJob) -> AppResult<ProcessingJob> {
        sqlx::query_as::<_, ProcessingJob>(
            "INSERT INTO processing_jobs \
             (file_id, job_type, status, style, custom_instructions, language) \
             VALUES ($1, $2, 'queued', $3, $4, $5) RETURNING *",
        )
        .bind(data.file_id)
        .bind(data.job_type)
        .bind(data.style)
        .bind(data.custom_instructions.as_deref())
        .bind(&data.language)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, ONE_LIVE_JOB_INDEX) {
                AppError::already_processing()
            } else {
                db_error("Failed to create job")(e)
            }
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ProcessingJob>> {
        sqlx::query_as::<_, ProcessingJob>("SELECT * FROM processing_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find job"))
    }

    async fn find_live_by_file(&self, file_id: Uuid) -> AppResult<Option<ProcessingJob>> {
        sqlx::query_as::<_, ProcessingJob>(
            "SELECT * FROM processing_jobs \
             WHERE file_id = $1 AND status IN ('queued', 'processing') LIMIT 1",
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find live job"))
    }

    async fn mark_processing(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE processing_jobs SET status = 'processing', started_at = NOW() \
             WHERE id = $1 AND status = 'queued'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to start job"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn finalize_error(&self, id: Uuid, message: &str) -> AppResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let file_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE processing_jobs SET status = 'error', error_message = $2, completed_at = NOW() \
             WHERE id = $1 AND status IN ('queued', 'processing') RETURNING file_id",
        )
        .bind(id)
        .bind(message)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to fail job"))?;

        let Some(file_id) = file_id else {
            tx.rollback()
                .await
                .map_err(db_error("Failed to roll back job failure"))?;
            return Ok(false);
        };

        sqlx::query(
            "UPDATE files SET status = 'failed', error_message = $2, processed_at = NOW(), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(file_id)
        .bind(message)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to mark file failed"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit job failure"))?;
        Ok(true)
    }

    async fn list_stale(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<ProcessingJob>> {
        sqlx::query_as::<_, ProcessingJob>(
            "SELECT * FROM processing_jobs \
             WHERE status IN ('queued', 'processing') AND created_at < $1 \
             ORDER BY created_at ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list stale jobs"))
    }
}
