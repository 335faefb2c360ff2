//! Presigned upload ledger: issue, confirm and sweep.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use paperhub_core::config::upload::UploadConfig;
use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_core::traits::{Bucket, ObjectStorage};
use paperhub_database::repositories::{FolderRepository, PendingUploadRepository};
use paperhub_entity::file::{CreateFile, CreatePendingUpload, File, PendingUpload};

use super::naming::{base_name, extension_of, sanitize_filename};
use crate::access::WorkspaceAccess;
use crate::context::RequestContext;

/// Issues and confirms direct-to-storage uploads.
#[derive(Clone)]
pub struct UploadService {
    /// Pending upload repository.
    pending: Arc<dyn PendingUploadRepository>,
    /// Folder repository, for validating target folders.
    folders: Arc<dyn FolderRepository>,
    /// Object storage.
    storage: Arc<dyn ObjectStorage>,
    /// Access filter.
    access: WorkspaceAccess,
    /// Upload limits.
    config: UploadConfig,
    /// Lifetime of presigned URLs.
    presign_expiry: Duration,
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService")
            .field("config", &self.config)
            .field("presign_expiry", &self.presign_expiry)
            .finish()
    }
}

/// Request for a presigned upload URL.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IssueUploadRequest {
    /// Original filename.
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    /// Declared size in bytes.
    #[validate(range(min = 1))]
    pub file_size: i64,
    /// Declared content type.
    pub content_type: String,
    /// Folder the file should land in.
    pub folder_id: Option<Uuid>,
}

/// A presigned upload the client can PUT to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedUpload {
    /// Pending upload id, exchanged for a file on confirm.
    pub upload_id: Uuid,
    /// Presigned URL.
    pub upload_url: String,
    /// HTTP method to use.
    pub method: String,
    /// Object key the bytes will be stored under.
    pub storage_path: String,
    /// When the URL (and the pending upload) expires.
    pub expires_at: DateTime<Utc>,
    /// Headers the client must send.
    pub headers: BTreeMap<String, String>,
}

/// Result of a sweep over abandoned uploads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Pending uploads removed.
    pub removed: u64,
    /// Staged objects that could not be deleted.
    pub objects_failed: u64,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(
        pending: Arc<dyn PendingUploadRepository>,
        folders: Arc<dyn FolderRepository>,
        storage: Arc<dyn ObjectStorage>,
        access: WorkspaceAccess,
        config: UploadConfig,
        presign_expiry: Duration,
    ) -> Self {
        Self {
            pending,
            folders,
            storage,
            access,
            config,
            presign_expiry,
        }
    }

    /// Issues a presigned PUT and records the pending upload.
    pub async fn issue_upload(
        &self,
        ctx: &RequestContext,
        req: IssueUploadRequest,
    ) -> AppResult<IssuedUpload> {
        req.validate()?;

        if req.content_type != self.config.accepted_content_type {
            return Err(AppError::invalid_field(
                "content_type",
                format!("Only {} files are accepted", self.config.accepted_content_type),
            ));
        }
        let max = self.config.max_file_size_bytes();
        if req.file_size as u64 > max {
            return Err(AppError::invalid_field(
                "file_size",
                format!(
                    "File size exceeds maximum limit of {} MB",
                    self.config.max_file_size_mb
                ),
            ));
        }

        let scope = self.access.resolve_scope(ctx).await?;
        if let Some(folder_id) = req.folder_id {
            self.folders
                .find_by_id(folder_id)
                .await?
                .filter(|f| f.in_scope(&scope))
                .ok_or_else(|| AppError::not_found("Folder not found"))?;
        }

        let upload_id = Uuid::new_v4();
        let ext = extension_of(&req.filename)
            .unwrap_or_else(|| self.config.default_extension.clone());
        let storage_path = format!("users/{}/files/{upload_id}{ext}", ctx.user_id);

        let presigned = self
            .storage
            .presign_put(
                Bucket::Uploads,
                &storage_path,
                &req.content_type,
                req.file_size as u64,
                self.presign_expiry,
            )
            .await?;

        let pending = self
            .pending
            .create(&CreatePendingUpload {
                id: upload_id,
                user_id: ctx.user_id,
                workspace_id: scope.workspace_id(),
                folder_id: req.folder_id,
                filename: base_name(&req.filename).to_string(),
                file_size: req.file_size,
                content_type: req.content_type.clone(),
                storage_path: storage_path.clone(),
                expires_at: presigned.expires_at,
            })
            .await?;

        info!(
            user_id = %ctx.user_id,
            upload_id = %pending.id,
            storage_path = %storage_path,
            size = req.file_size,
            "Presigned upload issued"
        );

        let mut headers = presigned.headers;
        headers.insert("Content-Type".to_string(), req.content_type);
        headers.insert("Content-Length".to_string(), req.file_size.to_string());

        Ok(IssuedUpload {
            upload_id: pending.id,
            upload_url: presigned.url,
            method: presigned.method,
            storage_path,
            expires_at: pending.expires_at,
            headers,
        })
    }

    /// Exchanges a completed upload for a permanent file.
    ///
    /// The object is copied into the files bucket before any row is
    /// written; a failed copy leaves the pending upload in place for a
    /// retry. The staged source is removed last and only best-effort.
    pub async fn confirm_upload(&self, ctx: &RequestContext, upload_id: Uuid) -> AppResult<File> {
        let pending = self.load(ctx, upload_id).await?;

        if pending.is_expired(Utc::now()) {
            return Err(AppError::invalid_field(
                "upload_id",
                "Upload has expired, request a new upload URL",
            ));
        }

        if !self
            .storage
            .exists(Bucket::Uploads, &pending.storage_path)
            .await?
        {
            return Err(AppError::invalid_field(
                "upload_id",
                "File has not been uploaded to storage",
            ));
        }

        self.storage
            .copy(
                Bucket::Uploads,
                &pending.storage_path,
                Bucket::Files,
                &pending.storage_path,
            )
            .await?;

        let record = CreateFile {
            user_id: pending.user_id,
            workspace_id: pending.workspace_id,
            folder_id: pending.folder_id,
            filename: sanitize_filename(&pending.filename),
            original_filename: pending.filename.clone(),
            storage_path: pending.storage_path.clone(),
            mime_type: pending.content_type.clone(),
            file_size: pending.file_size,
            page_count: None,
        };

        let file = self
            .pending
            .promote(pending.id, &record)
            .await?
            .ok_or_else(|| AppError::not_found("Upload not found"))?;

        if let Err(e) = self
            .storage
            .delete(Bucket::Uploads, &pending.storage_path)
            .await
        {
            warn!(
                upload_id = %pending.id,
                storage_path = %pending.storage_path,
                error = %e,
                "Failed to delete staged upload"
            );
        }

        info!(
            user_id = %ctx.user_id,
            upload_id = %pending.id,
            file_id = %file.id,
            filename = %file.filename,
            "Upload confirmed"
        );

        Ok(file)
    }

    /// Removes uploads that expired more than the retention period before
    /// `now`, along with their staged objects.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let cutoff = now - chrono::Duration::hours(self.config.pending_retention_hours);
        let expired = self.pending.list_expired(cutoff).await?;

        let mut report = SweepReport::default();
        for upload in expired {
            if let Err(e) = self
                .storage
                .delete(Bucket::Uploads, &upload.storage_path)
                .await
            {
                report.objects_failed += 1;
                warn!(
                    upload_id = %upload.id,
                    storage_path = %upload.storage_path,
                    error = %e,
                    "Failed to delete abandoned upload object"
                );
            }
            if self.pending.delete(upload.id).await? {
                report.removed += 1;
            }
        }

        if report.removed > 0 {
            info!(
                removed = report.removed,
                objects_failed = report.objects_failed,
                cutoff = %cutoff,
                "Expired uploads swept"
            );
        }

        Ok(report)
    }

    /// Load a pending upload issued to the caller.
    async fn load(&self, ctx: &RequestContext, upload_id: Uuid) -> AppResult<PendingUpload> {
        self.pending
            .find_by_id(upload_id)
            .await?
            .filter(|p| p.user_id == ctx.user_id)
            .ok_or_else(|| AppError::not_found("Upload not found"))
    }
}
