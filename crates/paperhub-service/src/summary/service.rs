//! Summarization orchestrator.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use paperhub_core::config::ai::AiConfig;
use paperhub_core::error::{AppError, ErrorKind};
use paperhub_core::result::AppResult;
use paperhub_database::repositories::{FileRepository, JobRepository, SummaryRepository};
use paperhub_entity::file::{File, ProcessingStatus};
use paperhub_entity::job::{CreateJob, JobType};
use paperhub_entity::summary::{NewSummary, StyleInfo, Summary, SummaryHistoryItem, SummaryStyle};

use super::dispatch::{SummaryDispatcher, SummaryRequest};
use crate::access::WorkspaceAccess;
use crate::context::RequestContext;
use crate::locks::KeyedLocks;

/// Languages the AI worker can write summaries in.
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["en", "id"];

/// Statuses a new attempt may start from.
const GENERATABLE: [ProcessingStatus; 3] = [
    ProcessingStatus::Uploaded,
    ProcessingStatus::Completed,
    ProcessingStatus::Failed,
];

/// Error recorded for attempts the reconciler gives up on.
const TIMEOUT_MESSAGE: &str = "Summary generation timed out";

/// Error recorded when the file left `pending` before the attempt started.
const START_RACE_MESSAGE: &str = "File status changed before summary generation started";

/// Drives the summarization state machine of files.
#[derive(Clone)]
pub struct SummaryService {
    /// File repository.
    files: Arc<dyn FileRepository>,
    /// Processing job repository.
    jobs: Arc<dyn JobRepository>,
    /// Summary repository.
    summaries: Arc<dyn SummaryRepository>,
    /// Access filter.
    access: WorkspaceAccess,
    /// Outbound request queue.
    dispatcher: Arc<dyn SummaryDispatcher>,
    /// Per-file critical sections.
    locks: Arc<KeyedLocks<Uuid>>,
    /// Callback URL and default language.
    ai: AiConfig,
}

impl std::fmt::Debug for SummaryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryService")
            .field("dispatcher", &self.dispatcher)
            .field("locked_files", &self.locks.len())
            .finish()
    }
}

/// Request to summarize a file.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateSummaryRequest {
    /// One of the supported styles.
    pub style: String,
    /// Extra instructions for the model.
    #[validate(length(max = 500))]
    pub custom_instructions: Option<String>,
    /// Summary language, the configured default when absent.
    #[validate(custom(function = "validate_language"))]
    pub language: Option<String>,
}

/// Accepted summarization attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSummaryResponse {
    /// File being summarized.
    pub file_id: Uuid,
    /// Always `processing` on acceptance.
    pub status: ProcessingStatus,
    /// Job tracking the attempt.
    pub job_id: Uuid,
    /// Requested style.
    pub style: SummaryStyle,
    /// Extra instructions, echoed.
    pub custom_instructions: Option<String>,
    /// Human-readable hint.
    pub message: String,
}

/// Status-only answer when no summary content can be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStatus {
    /// File the answer is about.
    pub file_id: Uuid,
    /// `pending`, `processing`, `failed` or `no_summary`.
    pub status: String,
    /// Human-readable explanation.
    pub message: String,
}

/// Either a stored summary or the reason there is none to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryView {
    /// A stored summary version.
    Ready(Summary),
    /// The file's processing state.
    Status(SummaryStatus),
}

/// Result reported by the AI worker, or by the dispatcher on its behalf.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryCallback {
    /// File the result is for.
    pub file_id: Uuid,
    /// Job the result is for; checked against the live job when present.
    #[serde(default)]
    pub job_id: Option<Uuid>,
    /// `completed` for success; anything else is a failure.
    pub status: String,
    /// Generated title.
    #[serde(default)]
    pub title: Option<String>,
    /// Summary text.
    #[serde(default)]
    pub content: Option<String>,
    /// Style the summary was written in.
    #[serde(default)]
    pub style: Option<SummaryStyle>,
    /// Extra instructions that were applied.
    #[serde(default)]
    pub custom_instructions: Option<String>,
    /// Model that produced the summary.
    #[serde(default)]
    pub model_used: Option<String>,
    /// Prompt tokens consumed.
    #[serde(default)]
    pub prompt_tokens: Option<i32>,
    /// Completion tokens produced.
    #[serde(default)]
    pub completion_tokens: Option<i32>,
    /// Wall-clock generation time.
    #[serde(default)]
    pub processing_duration_ms: Option<i32>,
    /// Summary language.
    #[serde(default)]
    pub language: Option<String>,
    /// Failure reason.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl SummaryCallback {
    /// Status value that routes a callback to the success path.
    pub const COMPLETED: &'static str = "completed";

    /// A failure report for `job_id`.
    pub fn failed(file_id: Uuid, job_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            file_id,
            job_id: Some(job_id),
            status: "failed".to_string(),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    fn is_success(&self) -> bool {
        self.status == Self::COMPLETED
    }
}

/// What a callback did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// A new summary version was stored.
    Completed(Summary),
    /// The attempt was recorded as failed.
    Failed,
    /// No matching live attempt; nothing was written.
    Ignored,
}

fn validate_language(language: &str) -> Result<(), ValidationError> {
    if SUPPORTED_LANGUAGES.contains(&language) {
        Ok(())
    } else {
        Err(ValidationError::new("language")
            .with_message(format!("Language must be one of: {}", SUPPORTED_LANGUAGES.join(", ")).into()))
    }
}

impl SummaryService {
    /// Creates a new summary service.
    pub fn new(
        files: Arc<dyn FileRepository>,
        jobs: Arc<dyn JobRepository>,
        summaries: Arc<dyn SummaryRepository>,
        access: WorkspaceAccess,
        dispatcher: Arc<dyn SummaryDispatcher>,
        ai: AiConfig,
    ) -> Self {
        Self {
            files,
            jobs,
            summaries,
            access,
            dispatcher,
            locks: Arc::new(KeyedLocks::new()),
            ai,
        }
    }

    /// Every supported style with its description.
    pub fn list_styles(&self) -> Vec<StyleInfo> {
        SummaryStyle::catalog()
    }

    /// Starts a summarization attempt.
    ///
    /// Returns as soon as the request is queued. At most one attempt per
    /// file is live at a time; a second caller gets `AlreadyProcessing`.
    pub async fn generate(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        req: GenerateSummaryRequest,
    ) -> AppResult<GenerateSummaryResponse> {
        let style: SummaryStyle = req.style.parse()?;
        req.validate()?;
        let language = req
            .language
            .clone()
            .unwrap_or_else(|| self.ai.default_language.clone());
        let custom_instructions = req
            .custom_instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        self.load(ctx, file_id).await?;
        let _guard = self.locks.acquire(file_id).await;

        // Re-read under the lock; the status may have moved meanwhile.
        let file = self
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;
        if !file.status.can_generate() || self.jobs.find_live_by_file(file_id).await?.is_some() {
            return Err(AppError::already_processing());
        }

        if !self
            .files
            .transition_status(file_id, &GENERATABLE, ProcessingStatus::Pending)
            .await?
        {
            return Err(AppError::already_processing());
        }

        let new_job = CreateJob {
            file_id,
            job_type: JobType::Summarize,
            style,
            custom_instructions: custom_instructions.clone(),
            language: language.clone(),
        };
        let job = match self.jobs.create(&new_job).await {
            Ok(job) => job,
            Err(e) => {
                self.files
                    .transition_status(file_id, &[ProcessingStatus::Pending], file.status)
                    .await?;
                return Err(e);
            }
        };

        let started = self
            .files
            .transition_status(
                file_id,
                &[ProcessingStatus::Pending],
                ProcessingStatus::Processing,
            )
            .await?
            && self.jobs.mark_processing(job.id).await?;
        if !started {
            warn!(
                file_id = %file_id,
                job_id = %job.id,
                "File left pending before dispatch"
            );
            self.jobs.finalize_error(job.id, START_RACE_MESSAGE).await?;
            return Err(AppError::conflict(START_RACE_MESSAGE));
        }

        let request = SummaryRequest {
            job_id: job.id,
            file_id,
            storage_path: file.storage_path.clone(),
            style,
            custom_instructions: custom_instructions.clone(),
            language,
            callback_url: self.ai.callback_url.clone(),
        };
        if let Err(e) = self.dispatcher.dispatch(request).await {
            warn!(
                file_id = %file_id,
                job_id = %job.id,
                error = %e,
                "Summary dispatch rejected"
            );
            self.jobs.finalize_error(job.id, &e.message).await?;
            return Err(AppError::upstream(format!(
                "Summary service unavailable: {}",
                e.message
            )));
        }

        info!(
            user_id = %ctx.user_id,
            file_id = %file_id,
            job_id = %job.id,
            style = %style,
            "Summary generation started"
        );

        Ok(GenerateSummaryResponse {
            file_id,
            status: ProcessingStatus::Processing,
            job_id: job.id,
            style,
            custom_instructions,
            message: format!(
                "Summary generation started. Check status at GET /summaries/{file_id}"
            ),
        })
    }

    /// The current summary of a file, a specific version, or its status.
    pub async fn get_by_file_id(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        version: Option<i32>,
    ) -> AppResult<SummaryView> {
        let file = self.load(ctx, file_id).await?;

        let status = |status: &str, message: String| {
            Ok(SummaryView::Status(SummaryStatus {
                file_id,
                status: status.to_string(),
                message,
            }))
        };

        match file.status {
            ProcessingStatus::Processing => {
                return status(
                    "processing",
                    "Summary is being generated. Please check back shortly.".into(),
                );
            }
            ProcessingStatus::Pending => {
                return status("pending", "Summary generation is queued.".into());
            }
            ProcessingStatus::Failed => {
                return status(
                    "failed",
                    file.error_message
                        .unwrap_or_else(|| "Summary generation failed".to_string()),
                );
            }
            ProcessingStatus::Uploaded => return status("no_summary", no_summary_message()),
            ProcessingStatus::Completed => {}
        }

        let summary = match version {
            Some(version) => self
                .summaries
                .find_version(file_id, version)
                .await?
                .ok_or_else(|| {
                    AppError::no_summary(format!("Summary version {version} not found"))
                })?,
            None => match self.summaries.find_current(file_id).await? {
                Some(summary) => summary,
                None => return status("no_summary", no_summary_message()),
            },
        };
        Ok(SummaryView::Ready(summary))
    }

    /// Every summary version of a file, newest first.
    pub async fn get_history(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
    ) -> AppResult<Vec<SummaryHistoryItem>> {
        self.load(ctx, file_id).await?;
        let history = self.summaries.history(file_id).await?;
        Ok(history.iter().map(SummaryHistoryItem::from).collect())
    }

    /// Applies a result reported for a file's live attempt.
    ///
    /// Results without a matching live job are ignored, so replays cannot
    /// add versions or revive a finished attempt.
    pub async fn process_callback(&self, callback: SummaryCallback) -> AppResult<CallbackOutcome> {
        let file_id = callback.file_id;
        let _guard = self.locks.acquire(file_id).await;

        if self.files.find_by_id(file_id).await?.is_none() {
            return Err(AppError::not_found("File not found"));
        }

        let Some(live) = self.jobs.find_live_by_file(file_id).await? else {
            warn!(
                file_id = %file_id,
                job_id = ?callback.job_id,
                status = %callback.status,
                "Callback without a live job ignored"
            );
            return Ok(CallbackOutcome::Ignored);
        };
        if callback.job_id.is_some_and(|id| id != live.id) {
            warn!(
                file_id = %file_id,
                job_id = ?callback.job_id,
                live_job_id = %live.id,
                "Callback for a stale job ignored"
            );
            return Ok(CallbackOutcome::Ignored);
        }

        let content = callback
            .content
            .as_deref()
            .filter(|c| !c.trim().is_empty());
        match content {
            Some(content) if callback.is_success() => {
                let summary = NewSummary {
                    file_id,
                    title: callback.title.clone(),
                    content: content.to_string(),
                    style: callback.style.unwrap_or(live.style),
                    custom_instructions: callback
                        .custom_instructions
                        .clone()
                        .or_else(|| live.custom_instructions.clone()),
                    model_used: callback.model_used.clone(),
                    prompt_tokens: callback.prompt_tokens,
                    completion_tokens: callback.completion_tokens,
                    processing_duration_ms: callback.processing_duration_ms,
                    language: callback
                        .language
                        .clone()
                        .unwrap_or_else(|| live.language.clone()),
                };
                match self.summaries.finalize_success(live.id, &summary).await? {
                    Some(stored) => {
                        info!(
                            file_id = %file_id,
                            job_id = %live.id,
                            summary_id = %stored.id,
                            version = stored.version,
                            "Summary stored"
                        );
                        Ok(CallbackOutcome::Completed(stored))
                    }
                    None => Ok(CallbackOutcome::Ignored),
                }
            }
            _ => {
                let message = match (callback.is_success(), callback.error_message.as_deref()) {
                    (true, _) => "Summary service returned no content",
                    (false, Some(msg)) if !msg.trim().is_empty() => msg,
                    (false, _) => "Summary generation failed",
                };
                if !self.jobs.finalize_error(live.id, message).await? {
                    return Ok(CallbackOutcome::Ignored);
                }
                warn!(
                    file_id = %file_id,
                    job_id = %live.id,
                    error = %message,
                    "Summary generation failed"
                );
                Ok(CallbackOutcome::Failed)
            }
        }
    }

    /// Fails live jobs created more than `older_than` before `now`.
    pub async fn reconcile_stale_jobs(
        &self,
        now: DateTime<Utc>,
        older_than: chrono::Duration,
    ) -> AppResult<u64> {
        let cutoff = now - older_than;
        let stale = self.jobs.list_stale(cutoff).await?;

        let mut failed = 0;
        for job in stale {
            let _guard = self.locks.acquire(job.file_id).await;
            match self.jobs.finalize_error(job.id, TIMEOUT_MESSAGE).await {
                Ok(true) => failed += 1,
                Ok(false) => {}
                Err(e) if e.is(ErrorKind::Database) => {
                    warn!(job_id = %job.id, error = %e, "Failed to reconcile stale job");
                }
                Err(e) => return Err(e),
            }
        }
        let pruned = self.locks.prune();

        if failed > 0 {
            info!(failed, pruned, cutoff = %cutoff, "Stale summary jobs reconciled");
        }
        Ok(failed)
    }

    async fn load(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<File> {
        let file = self
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))?;
        self.access
            .ensure_access(ctx, file.user_id, file.workspace_id, "File not found")
            .await?;
        Ok(file)
    }
}

fn no_summary_message() -> String {
    "No summary has been generated for this file yet. Click 'Summarize' to generate one."
        .to_string()
}
