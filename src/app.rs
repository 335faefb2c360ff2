//! Wiring: repositories, storage and services built from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;

use paperhub_core::config::AppConfig;
use paperhub_core::traits::ObjectStorage;
use paperhub_database::{DatabasePool, MemoryStore, Repositories};
use paperhub_service::{
    ChannelDispatcher, ExportService, FileService, FolderService, SummaryRequest, SummaryService,
    TreeService, UploadService, WorkspaceAccess, WorkspaceService,
};

/// `database.url` value selecting the in-memory store.
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Every service of a running PaperHub instance.
#[derive(Clone)]
pub struct App {
    /// Loaded configuration.
    pub config: AppConfig,
    /// PostgreSQL pool, absent for the in-memory store.
    pub pool: Option<DatabasePool>,
    /// Object storage gateway.
    pub storage: Arc<dyn ObjectStorage>,
    /// Workspace management.
    pub workspaces: WorkspaceService,
    /// Folder CRUD.
    pub folders: FolderService,
    /// Folder trees.
    pub trees: TreeService,
    /// Presigned uploads.
    pub uploads: UploadService,
    /// File lifecycle.
    pub files: FileService,
    /// CSV/JSON export.
    pub exports: ExportService,
    /// Summarization orchestrator.
    pub summaries: SummaryService,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("storage", &self.storage.provider_type())
            .field("postgres", &self.pool.is_some())
            .finish()
    }
}

impl App {
    /// Build the service graph. The receiver is the summary queue the
    /// dispatch worker drains.
    pub async fn build(config: AppConfig) -> anyhow::Result<(Self, mpsc::Receiver<SummaryRequest>)> {
        let (repos, pool) = if config.database.url == MEMORY_DATABASE_URL {
            info!("Using in-memory store");
            (Repositories::memory(Arc::new(MemoryStore::new())), None)
        } else {
            let pool = DatabasePool::connect(&config.database)
                .await
                .context("Failed to connect to PostgreSQL")?;
            (pool.repositories(), Some(pool))
        };

        let storage = paperhub_storage::connect(&config.storage)
            .await
            .context("Failed to initialize object storage")?;

        let presign_expiry =
            Duration::from_secs(config.storage.presign_expiry_minutes.max(1) as u64 * 60);
        let (dispatcher, rx) = ChannelDispatcher::channel(config.worker.queue_capacity);

        let access = WorkspaceAccess::new(repos.workspaces.clone());
        let app = Self {
            workspaces: WorkspaceService::new(repos.workspaces.clone(), access.clone()),
            folders: FolderService::new(repos.folders.clone(), storage.clone(), access.clone()),
            trees: TreeService::new(repos.folders.clone(), repos.files.clone(), access.clone()),
            uploads: UploadService::new(
                repos.pending_uploads.clone(),
                repos.folders.clone(),
                storage.clone(),
                access.clone(),
                config.upload.clone(),
                presign_expiry,
            ),
            files: FileService::new(
                repos.files.clone(),
                repos.folders.clone(),
                repos.summaries.clone(),
                storage.clone(),
                access.clone(),
                presign_expiry,
            ),
            exports: ExportService::new(repos.files.clone(), repos.workspaces.clone(), access.clone()),
            summaries: SummaryService::new(
                repos.files.clone(),
                repos.jobs.clone(),
                repos.summaries.clone(),
                access,
                Arc::new(dispatcher),
                config.ai.clone(),
            ),
            storage,
            pool,
            config,
        };

        Ok((app, rx))
    }
}
