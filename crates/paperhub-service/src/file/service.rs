//! File listing, detail, move, rename, delete and download links.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_core::traits::{Bucket, ObjectStorage, PresignedRequest};
use paperhub_core::types::{PageRequest, PageResponse};
use paperhub_database::repositories::{FileRepository, FolderRepository, SummaryRepository};
use paperhub_entity::OwnerScope;
use paperhub_entity::file::{
    File, FileFilter, FileListItem, FileQuery, FileSort, ProcessingStatus,
};
use paperhub_entity::summary::SummaryStyle;

use super::naming::{base_name, sanitize_filename};
use crate::access::WorkspaceAccess;
use crate::context::RequestContext;

/// Manages files after their upload was confirmed.
#[derive(Clone)]
pub struct FileService {
    /// File repository.
    files: Arc<dyn FileRepository>,
    /// Folder repository.
    folders: Arc<dyn FolderRepository>,
    /// Summary repository, for detail views.
    summaries: Arc<dyn SummaryRepository>,
    /// Object storage.
    storage: Arc<dyn ObjectStorage>,
    /// Access filter.
    access: WorkspaceAccess,
    /// Lifetime of download links.
    presign_expiry: Duration,
}

impl std::fmt::Debug for FileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService")
            .field("storage", &self.storage.provider_type())
            .finish()
    }
}

/// Raw listing parameters as received from a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListFilesParams {
    /// Only files directly in this folder.
    pub folder_id: Option<Uuid>,
    /// Only files in this processing status.
    pub status: Option<String>,
    /// Case-insensitive substring of the stored or original filename.
    pub search: Option<String>,
    /// Sort key from the allow-list.
    pub sort: Option<String>,
    /// Page number (1-based).
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

impl ListFilesParams {
    /// Parsed filter portion of the parameters.
    pub fn filter(&self) -> AppResult<FileFilter> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<ProcessingStatus>()?),
        };
        Ok(FileFilter {
            folder_id: self.folder_id,
            status,
            search: self.search.clone(),
        })
    }

    fn page(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.limit.unwrap_or(defaults.limit),
        )
    }
}

/// Request to move a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveFileRequest {
    /// Target folder (`None` moves to the root).
    pub folder_id: Option<Uuid>,
}

/// Request to rename a file.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenameFileRequest {
    /// New display filename.
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
}

/// The folder a file lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    /// Folder ID.
    pub id: Uuid,
    /// Folder name.
    pub name: String,
    /// Materialized path.
    pub path: String,
}

/// Short description of the current summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryBrief {
    /// Summary ID.
    pub id: Uuid,
    /// Version number.
    pub version: i32,
    /// Generated title.
    pub title: Option<String>,
    /// Style used.
    pub style: SummaryStyle,
    /// Model that produced it.
    pub model_used: Option<String>,
    /// When it was stored.
    pub created_at: DateTime<Utc>,
}

/// A file with its folder and current summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDetail {
    /// The file row.
    #[serde(flatten)]
    pub file: File,
    /// Containing folder, `None` at the root.
    pub folder: Option<FolderRef>,
    /// Current summary, if one exists.
    pub current_summary: Option<SummaryBrief>,
}

impl FileService {
    /// Creates a new file service.
    pub fn new(
        files: Arc<dyn FileRepository>,
        folders: Arc<dyn FolderRepository>,
        summaries: Arc<dyn SummaryRepository>,
        storage: Arc<dyn ObjectStorage>,
        access: WorkspaceAccess,
        presign_expiry: Duration,
    ) -> Self {
        Self {
            files,
            folders,
            summaries,
            storage,
            access,
            presign_expiry,
        }
    }

    /// Lists files of the caller's effective scope.
    pub async fn list_files(
        &self,
        ctx: &RequestContext,
        params: &ListFilesParams,
    ) -> AppResult<PageResponse<FileListItem>> {
        let query = FileQuery {
            scope: self.access.resolve_scope(ctx).await?,
            filter: params.filter()?,
            sort: FileSort::parse(params.sort.as_deref()),
            page: params.page(),
        };
        self.files.list(&query).await
    }

    /// One file with its folder and current summary.
    pub async fn get_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<FileDetail> {
        let file = self.load(ctx, file_id).await?;

        let folder = match file.folder_id {
            Some(folder_id) => self.folders.find_by_id(folder_id).await?.map(|f| FolderRef {
                id: f.id,
                name: f.name,
                path: f.path,
            }),
            None => None,
        };

        let current_summary = self
            .summaries
            .find_current(file_id)
            .await?
            .map(|s| SummaryBrief {
                id: s.id,
                version: s.version,
                title: s.title,
                style: s.style,
                model_used: s.model_used,
                created_at: s.created_at,
            });

        Ok(FileDetail {
            file,
            folder,
            current_summary,
        })
    }

    /// A presigned GET for the file's bytes.
    pub async fn download_url(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
    ) -> AppResult<PresignedRequest> {
        let file = self.load(ctx, file_id).await?;
        self.storage
            .presign_get(Bucket::Files, &file.storage_path, self.presign_expiry)
            .await
    }

    /// Moves a file to another folder of the same scope, or the root.
    pub async fn move_file(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        req: MoveFileRequest,
    ) -> AppResult<File> {
        let file = self.load(ctx, file_id).await?;

        if let Some(folder_id) = req.folder_id {
            let scope = OwnerScope::of(file.user_id, file.workspace_id);
            self.folders
                .find_by_id(folder_id)
                .await?
                .filter(|f| f.in_scope(&scope))
                .ok_or_else(|| AppError::not_found("Target folder not found"))?;
        }

        let moved = self.files.set_folder(file_id, req.folder_id).await?;
        info!(
            user_id = %ctx.user_id,
            file_id = %file_id,
            folder_id = ?req.folder_id,
            "File moved"
        );
        Ok(moved)
    }

    /// Renames a file. The display name is kept as given; the stored name
    /// is its sanitized form.
    pub async fn rename_file(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        req: RenameFileRequest,
    ) -> AppResult<File> {
        req.validate()?;
        let display = base_name(&req.filename).to_string();
        if display.is_empty() {
            return Err(AppError::invalid_field("filename", "Filename cannot be empty"));
        }
        self.load(ctx, file_id).await?;

        let renamed = self
            .files
            .rename(file_id, &sanitize_filename(&display), &display)
            .await?;
        info!(
            user_id = %ctx.user_id,
            file_id = %file_id,
            filename = %renamed.filename,
            "File renamed"
        );
        Ok(renamed)
    }

    /// Deletes a file, its summaries and jobs, and (best-effort) its object.
    pub async fn delete_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<()> {
        let file = self.load(ctx, file_id).await?;

        if let Err(e) = self.storage.delete(Bucket::Files, &file.storage_path).await {
            warn!(
                file_id = %file_id,
                storage_path = %file.storage_path,
                error = %e,
                "Failed to delete file object"
            );
        }

        if !self.files.delete(file_id).await? {
            return Err(AppError::not_found("File not found"));
        }

        info!(user_id = %ctx.user_id, file_id = %file_id, "File deleted");
        Ok(())
    }

    /// Load a file the caller may act on.
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

#[cfg(test)]
mod tests {
    use super::*;
    use paperhub_core::error::ErrorKind;

    #[test]
    fn test_params_parse_status_and_page() {
        let params = ListFilesParams {
            status: Some("completed".into()),
            page: Some(0),
            limit: Some(500),
            ..Default::default()
        };
        let filter = params.filter().unwrap();
        assert_eq!(filter.status, Some(ProcessingStatus::Completed));
        let page = params.page();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 100);
    }

    #[test]
    fn test_params_reject_unknown_status() {
        let params = ListFilesParams {
            status: Some("archived".into()),
            ..Default::default()
        };
        assert_eq!(params.filter().unwrap_err().kind, ErrorKind::Validation);
    }

    #[test]
    fn test_blank_status_means_any() {
        let params = ListFilesParams {
            status: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(params.filter().unwrap().status, None);
    }
}
