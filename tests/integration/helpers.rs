//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

use paperhub_core::config::ai::AiConfig;
use paperhub_core::config::upload::UploadConfig;
use paperhub_core::traits::storage::{Bucket, ObjectStorage};
use paperhub_database::{MemoryStore, Repositories};
use paperhub_entity::file::File;
use paperhub_entity::summary::Summary;
use paperhub_service::file::upload::IssueUploadRequest;
use paperhub_service::summary::{CallbackOutcome, SummaryCallback};
use paperhub_service::{
    ChannelDispatcher, ExportService, FileService, FolderService, RequestContext, SummaryRequest,
    SummaryService, TreeService, UploadService, WorkspaceAccess, WorkspaceService,
};
use paperhub_storage::MemoryObjectStorage;

/// Test application context
pub struct TestApp {
    /// Backing store for direct inspection
    pub store: Arc<MemoryStore>,
    /// Object storage for direct inspection
    pub objects: Arc<MemoryObjectStorage>,
    pub workspaces: WorkspaceService,
    pub folders: FolderService,
    pub trees: TreeService,
    pub uploads: UploadService,
    pub files: FileService,
    pub exports: ExportService,
    pub summaries: SummaryService,
    /// Requests the summary service handed to the dispatcher
    pub requests: mpsc::Receiver<SummaryRequest>,
}

impl TestApp {
    /// Create a new test application over in-memory backends
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryObjectStorage::new());
        let storage: Arc<dyn ObjectStorage> = objects.clone();
        let repos = Repositories::memory(store.clone());
        let access = WorkspaceAccess::new(repos.workspaces.clone());
        let expiry = Duration::from_secs(900);
        let (dispatcher, requests) = ChannelDispatcher::channel(16);

        Self {
            workspaces: WorkspaceService::new(repos.workspaces.clone(), access.clone()),
            folders: FolderService::new(repos.folders.clone(), storage.clone(), access.clone()),
            trees: TreeService::new(repos.folders.clone(), repos.files.clone(), access.clone()),
            uploads: UploadService::new(
                repos.pending_uploads.clone(),
                repos.folders.clone(),
                storage.clone(),
                access.clone(),
                UploadConfig::default(),
                expiry,
            ),
            files: FileService::new(
                repos.files.clone(),
                repos.folders.clone(),
                repos.summaries.clone(),
                storage,
                access.clone(),
                expiry,
            ),
            exports: ExportService::new(repos.files.clone(), repos.workspaces.clone(), access.clone()),
            summaries: SummaryService::new(
                repos.files.clone(),
                repos.jobs.clone(),
                repos.summaries.clone(),
                access,
                Arc::new(dispatcher),
                AiConfig::default(),
            ),
            store,
            objects,
            requests,
        }
    }

    /// Issue an upload, PUT the bytes and confirm it
    pub async fn upload_pdf(
        &self,
        ctx: &RequestContext,
        filename: &str,
        folder_id: Option<Uuid>,
    ) -> File {
        let body = Bytes::from_static(b"%PDF-1.7\n%test\n");
        let issued = self
            .uploads
            .issue_upload(
                ctx,
                IssueUploadRequest {
                    filename: filename.to_string(),
                    file_size: body.len() as i64,
                    content_type: "application/pdf".to_string(),
                    folder_id,
                },
            )
            .await
            .expect("Failed to issue upload");

        self.objects
            .put(Bucket::Uploads, &issued.storage_path, body)
            .await
            .expect("Failed to stage object");

        self.uploads
            .confirm_upload(ctx, issued.upload_id)
            .await
            .expect("Failed to confirm upload")
    }

    /// Take the next dispatched request and answer it with a success callback
    pub async fn complete_next(&mut self, content: &str) -> Summary {
        let request = self.requests.recv().await.expect("No summary request dispatched");
        let outcome = self
            .summaries
            .process_callback(SummaryCallback {
                file_id: request.file_id,
                job_id: Some(request.job_id),
                status: SummaryCallback::COMPLETED.to_string(),
                title: Some("Summary".to_string()),
                content: Some(content.to_string()),
                style: Some(request.style),
                model_used: Some("test-model".to_string()),
                processing_duration_ms: Some(1200),
                language: Some(request.language.clone()),
                ..Default::default()
            })
            .await
            .expect("Callback failed");

        match outcome {
            CallbackOutcome::Completed(summary) => summary,
            other => panic!("Expected a stored summary, got {other:?}"),
        }
    }
}

/// A fresh user acting on personal data
pub fn personal_user() -> RequestContext {
    RequestContext::personal(Uuid::new_v4())
}
