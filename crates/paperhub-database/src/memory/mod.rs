//! In-memory implementation of every repository trait.
//!
//! One lock guards the whole state so multi-row operations (cascade
//! delete, summary finalization, confirm) are atomic the same way their
//! PostgreSQL transactions are. Used by tests and the `memory` profile.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_core::types::PageResponse;
use paperhub_entity::OwnerScope;
use paperhub_entity::file::export::{PERSONAL_WORKSPACE_LABEL, ROOT_FOLDER_LABEL};
use paperhub_entity::file::{
    CreateFile, CreatePendingUpload, ExportRow, File, FileFilter, FileListItem, FileQuery,
    PendingUpload, ProcessingStatus,
};
use paperhub_entity::folder::{CreateFolder, Folder, FolderStats};
use paperhub_entity::job::{CreateJob, JobStatus, ProcessingJob};
use paperhub_entity::summary::{NewSummary, Summary};
use paperhub_entity::workspace::{
    Workspace, WorkspaceMember, WorkspaceRole, WorkspaceWithRole, normalize_invite_code,
};

use crate::repositories::{
    CascadeDelete, FileRepository, FolderRepository, JobRepository, PendingUploadRepository,
    SummaryRepository, WorkspaceRepository,
};

#[derive(Debug, Default)]
struct MemoryState {
    workspaces: HashMap<Uuid, Workspace>,
    members: Vec<WorkspaceMember>,
    folders: HashMap<Uuid, Folder>,
    files: HashMap<Uuid, File>,
    pending: HashMap<Uuid, PendingUpload>,
    jobs: HashMap<Uuid, ProcessingJob>,
    summaries: Vec<Summary>,
}

impl MemoryState {
    fn has_current_summary(&self, file_id: Uuid) -> bool {
        self.summaries
            .iter()
            .any(|s| s.file_id == file_id && s.is_current)
    }

    fn list_item(&self, file: &File) -> FileListItem {
        FileListItem::from_file(file, self.has_current_summary(file.id))
    }

    /// `root` and every folder below it.
    fn folder_subtree(&self, root: Uuid) -> Vec<Uuid> {
        if !self.folders.contains_key(&root) {
            return Vec::new();
        }
        let mut ids = vec![root];
        let mut next = 0;
        while next < ids.len() {
            let parent = ids[next];
            ids.extend(
                self.folders
                    .values()
                    .filter(|f| f.parent_id == Some(parent))
                    .map(|f| f.id),
            );
            next += 1;
        }
        ids
    }

    /// Whether `id` is reachable from its own parent chain.
    fn is_own_ancestor(&self, id: Uuid) -> bool {
        let mut seen = HashSet::new();
        let mut cursor = self.folders.get(&id).and_then(|f| f.parent_id);
        while let Some(current) = cursor {
            if current == id {
                return true;
            }
            if !seen.insert(current) {
                return false;
            }
            cursor = self.folders.get(&current).and_then(|f| f.parent_id);
        }
        false
    }

    fn remove_file(&mut self, id: Uuid) -> Option<File> {
        let file = self.files.remove(&id)?;
        self.summaries.retain(|s| s.file_id != id);
        self.jobs.retain(|_, j| j.file_id != id);
        Some(file)
    }
}

/// Row counts, for assertions in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryCounts {
    /// Folder rows.
    pub folders: usize,
    /// File rows.
    pub files: usize,
    /// Pending upload rows.
    pub pending_uploads: usize,
    /// Job rows.
    pub jobs: usize,
    /// Summary rows.
    pub summaries: usize,
}

/// In-memory store implementing all repository traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| AppError::internal(format!("Memory store poisoned: {e}")))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| AppError::internal(format!("Memory store poisoned: {e}")))
    }

    /// Current row counts.
    pub fn counts(&self) -> AppResult<MemoryCounts> {
        let state = self.read()?;
        Ok(MemoryCounts {
            folders: state.folders.len(),
            files: state.files.len(),
            pending_uploads: state.pending.len(),
            jobs: state.jobs.len(),
            summaries: state.summaries.len(),
        })
    }
}

#[async_trait]
impl FolderRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>> {
        Ok(self.read()?.folders.get(&id).cloned())
    }

    async fn list_by_scope(&self, scope: &OwnerScope) -> AppResult<Vec<Folder>> {
        let state = self.read()?;
        let mut folders: Vec<Folder> = state
            .folders
            .values()
            .filter(|f| f.in_scope(scope))
            .cloned()
            .collect();
        folders.sort_by(|a, b| {
            (a.depth, a.sort_order, &a.name).cmp(&(b.depth, b.sort_order, &b.name))
        });
        Ok(folders)
    }

    async fn stats_by_scope(&self, scope: &OwnerScope) -> AppResult<Vec<FolderStats>> {
        let state = self.read()?;
        let mut stats: HashMap<Uuid, FolderStats> = HashMap::new();
        for file in state.files.values().filter(|f| f.in_scope(scope)) {
            if let Some(folder_id) = file.folder_id {
                let entry = stats.entry(folder_id).or_insert(FolderStats {
                    folder_id,
                    ..Default::default()
                });
                entry.file_count += 1;
                entry.total_size += file.file_size;
            }
        }
        Ok(stats.into_values().collect())
    }

    async fn create(&self, data: &CreateFolder) -> AppResult<Folder> {
        let now = Utc::now();
        let folder = Folder {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            workspace_id: data.workspace_id,
            parent_id: data.parent_id,
            name: data.name.clone(),
            path: data.path.clone(),
            depth: data.depth,
            sort_order: data.sort_order,
            created_at: now,
            updated_at: now,
        };
        self.write()?.folders.insert(folder.id, folder.clone());
        Ok(folder)
    }

    async fn update_subtree(&self, folders: &[Folder]) -> AppResult<()> {
        let mut state = self.write()?;
        if let Some(missing) = folders.iter().find(|f| !state.folders.contains_key(&f.id)) {
            return Err(AppError::not_found(format!("Folder {} not found", missing.id)));
        }

        let previous: Vec<Folder> = folders
            .iter()
            .filter_map(|f| state.folders.get(&f.id).cloned())
            .collect();
        let now = Utc::now();
        for folder in folders {
            if let Some(stored) = state.folders.get_mut(&folder.id) {
                stored.parent_id = folder.parent_id;
                stored.name = folder.name.clone();
                stored.path = folder.path.clone();
                stored.depth = folder.depth;
                stored.sort_order = folder.sort_order;
                stored.updated_at = now;
            }
        }

        if folders.iter().any(|f| state.is_own_ancestor(f.id)) {
            for folder in previous {
                state.folders.insert(folder.id, folder);
            }
            return Err(AppError::invalid_field(
                "parent_id",
                "Cannot move a folder into itself or one of its subfolders",
            ));
        }
        Ok(())
    }

    async fn delete_cascade(&self, folder_id: Uuid) -> AppResult<CascadeDelete> {
        let mut state = self.write()?;
        let folder_ids = state.folder_subtree(folder_id);
        let file_ids: Vec<Uuid> = state
            .files
            .values()
            .filter(|f| f.folder_id.is_some_and(|id| folder_ids.contains(&id)))
            .map(|f| f.id)
            .collect();

        let files = file_ids
            .into_iter()
            .filter_map(|id| state.remove_file(id))
            .collect();
        state
            .pending
            .retain(|_, p| !p.folder_id.is_some_and(|id| folder_ids.contains(&id)));

        let before = state.folders.len();
        state.folders.retain(|id, _| !folder_ids.contains(id));
        let folders_deleted = (before - state.folders.len()) as u64;

        Ok(CascadeDelete {
            folders_deleted,
            files,
        })
    }
}

#[async_trait]
impl FileRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>> {
        Ok(self.read()?.files.get(&id).cloned())
    }

    async fn list(&self, query: &FileQuery) -> AppResult<PageResponse<FileListItem>> {
        let state = self.read()?;
        let mut matching: Vec<&File> = state
            .files
            .values()
            .filter(|f| f.in_scope(&query.scope) && query.filter.matches(f))
            .collect();
        matching.sort_by(|a, b| query.sort.compare(a, b));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(query.page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(query.page.limit).unwrap_or(usize::MAX))
            .map(|f| state.list_item(f))
            .collect();
        Ok(PageResponse::new(items, &query.page, total))
    }

    async fn list_by_scope(&self, scope: &OwnerScope) -> AppResult<Vec<FileListItem>> {
        let state = self.read()?;
        let mut items: Vec<FileListItem> = state
            .files
            .values()
            .filter(|f| f.in_scope(scope))
            .map(|f| state.list_item(f))
            .collect();
        items.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(items)
    }

    async fn set_folder(&self, id: Uuid, folder_id: Option<Uuid>) -> AppResult<File> {
        let mut state = self.write()?;
        let file = state
            .files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        file.folder_id = folder_id;
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    async fn rename(&self, id: Uuid, filename: &str, original_filename: &str) -> AppResult<File> {
        let mut state = self.write()?;
        let file = state
            .files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        file.filename = filename.to_string();
        file.original_filename = original_filename.to_string();
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: &[ProcessingStatus],
        to: ProcessingStatus,
    ) -> AppResult<bool> {
        let mut state = self.write()?;
        let Some(file) = state.files.get_mut(&id) else {
            return Ok(false);
        };
        if !from.contains(&file.status) {
            return Ok(false);
        }
        file.status = to;
        if to == ProcessingStatus::Pending {
            file.error_message = None;
        }
        file.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.write()?.remove_file(id).is_some())
    }

    async fn export(
        &self,
        scope: &OwnerScope,
        filter: &FileFilter,
        ids: Option<&[Uuid]>,
    ) -> AppResult<Vec<ExportRow>> {
        let state = self.read()?;
        let mut files: Vec<&File> = state
            .files
            .values()
            .filter(|f| f.in_scope(scope))
            .filter(|f| match ids {
                Some(ids) => ids.contains(&f.id),
                None => filter.matches(f),
            })
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let mut rows = Vec::new();
        for file in files {
            let folder_path = file
                .folder_id
                .and_then(|id| state.folders.get(&id))
                .map(|f| f.path.clone())
                .unwrap_or_else(|| ROOT_FOLDER_LABEL.to_string());
            let workspace_name = file
                .workspace_id
                .and_then(|id| state.workspaces.get(&id))
                .map(|w| w.name.clone())
                .unwrap_or_else(|| PERSONAL_WORKSPACE_LABEL.to_string());

            let mut summaries: Vec<&Summary> = state
                .summaries
                .iter()
                .filter(|s| s.file_id == file.id)
                .collect();
            summaries.sort_by(|a, b| b.version.cmp(&a.version));

            let base = |s: Option<&Summary>| ExportRow {
                id: file.id,
                filename: file.filename.clone(),
                original_filename: file.original_filename.clone(),
                file_size: file.file_size,
                page_count: file.page_count,
                mime_type: file.mime_type.clone(),
                uploaded_at: file.uploaded_at,
                created_at: file.created_at,
                status: file.status,
                folder_path: folder_path.clone(),
                workspace_name: workspace_name.clone(),
                summary_version: s.map(|s| s.version),
                summary_model: s.and_then(|s| s.model_used.clone()),
                summary_created_at: s.map(|s| s.created_at),
                summary_duration_ms: s.and_then(|s| s.processing_duration_ms),
                summary_content: s.map(|s| s.content.clone()),
            };

            if summaries.is_empty() {
                rows.push(base(None));
            } else {
                rows.extend(summaries.into_iter().map(|s| base(Some(s))));
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl PendingUploadRepository for MemoryStore {
    async fn create(&self, data: &CreatePendingUpload) -> AppResult<PendingUpload> {
        let upload = PendingUpload {
            id: data.id,
            user_id: data.user_id,
            workspace_id: data.workspace_id,
            folder_id: data.folder_id,
            filename: data.filename.clone(),
            file_size: data.file_size,
            content_type: data.content_type.clone(),
            storage_path: data.storage_path.clone(),
            expires_at: data.expires_at,
            created_at: Utc::now(),
        };
        let mut state = self.write()?;
        if state.pending.contains_key(&upload.id) {
            return Err(AppError::conflict(format!(
                "Pending upload {} already exists",
                upload.id
            )));
        }
        state.pending.insert(upload.id, upload.clone());
        Ok(upload)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<PendingUpload>> {
        Ok(self.read()?.pending.get(&id).cloned())
    }

    async fn promote(&self, id: Uuid, data: &CreateFile) -> AppResult<Option<File>> {
        let mut state = self.write()?;
        if state.pending.remove(&id).is_none() {
            return Ok(None);
        }
        let now = Utc::now();
        let file = File {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            workspace_id: data.workspace_id,
            folder_id: data.folder_id,
            filename: data.filename.clone(),
            original_filename: data.original_filename.clone(),
            storage_path: data.storage_path.clone(),
            mime_type: data.mime_type.clone(),
            file_size: data.file_size,
            page_count: data.page_count,
            status: ProcessingStatus::Uploaded,
            error_message: None,
            uploaded_at: now,
            processed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.files.insert(file.id, file.clone());
        Ok(Some(file))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.write()?.pending.remove(&id).is_some())
    }

    async fn list_expired(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<PendingUpload>> {
        let state = self.read()?;
        let mut expired: Vec<PendingUpload> = state
            .pending
            .values()
            .filter(|p| p.expires_at < cutoff)
            .cloned()
            .collect();
        expired.sort_by_key(|p| p.expires_at);
        Ok(expired)
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn create(&self, data: &CreateJob) -> AppResult<ProcessingJob> {
        let mut state = self.write()?;
        if state.jobs.values().any(|j| j.file_id == data.file_id && j.is_live()) {
            return Err(AppError::already_processing());
        }
        let job = ProcessingJob {
            id: Uuid::new_v4(),
            file_id: data.file_id,
            job_type: data.job_type,
            status: JobStatus::Queued,
            style: data.style,
            custom_instructions: data.custom_instructions.clone(),
            language: data.language.clone(),
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        state.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ProcessingJob>> {
        Ok(self.read()?.jobs.get(&id).cloned())
    }

    async fn find_live_by_file(&self, file_id: Uuid) -> AppResult<Option<ProcessingJob>> {
        Ok(self
            .read()?
            .jobs
            .values()
            .find(|j| j.file_id == file_id && j.is_live())
            .cloned())
    }

    async fn mark_processing(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.write()?;
        match state.jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Queued => {
                job.status = JobStatus::Processing;
                job.started_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn finalize_error(&self, id: Uuid, message: &str) -> AppResult<bool> {
        let mut state = self.write()?;
        let now = Utc::now();
        let file_id = match state.jobs.get_mut(&id) {
            Some(job) if job.is_live() => {
                job.status = JobStatus::Error;
                job.error_message = Some(message.to_string());
                job.completed_at = Some(now);
                job.file_id
            }
            _ => return Ok(false),
        };
        if let Some(file) = state.files.get_mut(&file_id) {
            file.status = ProcessingStatus::Failed;
            file.error_message = Some(message.to_string());
            file.processed_at = Some(now);
            file.updated_at = now;
        }
        Ok(true)
    }

    async fn list_stale(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<ProcessingJob>> {
        let state = self.read()?;
        let mut stale: Vec<ProcessingJob> = state
            .jobs
            .values()
            .filter(|j| j.is_live() && j.created_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|j| j.created_at);
        Ok(stale)
    }
}

#[async_trait]
impl SummaryRepository for MemoryStore {
    async fn finalize_success(
        &self,
        job_id: Uuid,
        summary: &NewSummary,
    ) -> AppResult<Option<Summary>> {
        let mut state = self.write()?;
        let now = Utc::now();
        match state.jobs.get_mut(&job_id) {
            Some(job) if job.is_live() && job.file_id == summary.file_id => {
                job.status = JobStatus::Done;
                job.completed_at = Some(now);
            }
            _ => return Ok(None),
        }

        let version = state
            .summaries
            .iter()
            .filter(|s| s.file_id == summary.file_id)
            .map(|s| s.version)
            .max()
            .unwrap_or(0)
            + 1;
        for existing in state
            .summaries
            .iter_mut()
            .filter(|s| s.file_id == summary.file_id)
        {
            existing.is_current = false;
        }

        let stored = Summary {
            id: Uuid::new_v4(),
            file_id: summary.file_id,
            version,
            is_current: true,
            title: summary.title.clone(),
            content: summary.content.clone(),
            style: summary.style,
            custom_instructions: summary.custom_instructions.clone(),
            model_used: summary.model_used.clone(),
            prompt_tokens: summary.prompt_tokens,
            completion_tokens: summary.completion_tokens,
            processing_duration_ms: summary.processing_duration_ms,
            language: summary.language.clone(),
            created_at: now,
        };
        state.summaries.push(stored.clone());

        if let Some(file) = state.files.get_mut(&summary.file_id) {
            file.status = ProcessingStatus::Completed;
            file.error_message = None;
            file.processed_at = Some(now);
            file.updated_at = now;
        }
        Ok(Some(stored))
    }

    async fn find_current(&self, file_id: Uuid) -> AppResult<Option<Summary>> {
        Ok(self
            .read()?
            .summaries
            .iter()
            .find(|s| s.file_id == file_id && s.is_current)
            .cloned())
    }

    async fn find_version(&self, file_id: Uuid, version: i32) -> AppResult<Option<Summary>> {
        Ok(self
            .read()?
            .summaries
            .iter()
            .find(|s| s.file_id == file_id && s.version == version)
            .cloned())
    }

    async fn history(&self, file_id: Uuid) -> AppResult<Vec<Summary>> {
        let state = self.read()?;
        let mut versions: Vec<Summary> = state
            .summaries
            .iter()
            .filter(|s| s.file_id == file_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }
}

#[async_trait]
impl WorkspaceRepository for MemoryStore {
    async fn create(&self, name: &str, invite_code: &str, owner_id: Uuid) -> AppResult<Workspace> {
        let mut state = self.write()?;
        let code = normalize_invite_code(invite_code);
        if state.workspaces.values().any(|w| w.invite_code == code) {
            return Err(AppError::conflict("Invite code already in use"));
        }
        let now = Utc::now();
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: name.to_string(),
            invite_code: code,
            owner_id,
            created_at: now,
            updated_at: now,
        };
        state.workspaces.insert(workspace.id, workspace.clone());
        state.members.push(WorkspaceMember {
            workspace_id: workspace.id,
            user_id: owner_id,
            role: WorkspaceRole::Owner,
            joined_at: now,
        });
        Ok(workspace)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Workspace>> {
        Ok(self.read()?.workspaces.get(&id).cloned())
    }

    async fn find_by_invite_code(&self, code: &str) -> AppResult<Option<Workspace>> {
        let code = normalize_invite_code(code);
        Ok(self
            .read()?
            .workspaces
            .values()
            .find(|w| w.invite_code == code)
            .cloned())
    }

    async fn find_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<WorkspaceMember>> {
        Ok(self
            .read()?
            .members
            .iter()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
            .cloned())
    }

    async fn add_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
    ) -> AppResult<WorkspaceMember> {
        let mut state = self.write()?;
        if !state.workspaces.contains_key(&workspace_id) {
            return Err(AppError::not_found(format!(
                "Workspace {workspace_id} not found"
            )));
        }
        if state
            .members
            .iter()
            .any(|m| m.workspace_id == workspace_id && m.user_id == user_id)
        {
            return Err(AppError::already_member());
        }
        let member = WorkspaceMember {
            workspace_id,
            user_id,
            role,
            joined_at: Utc::now(),
        };
        state.members.push(member.clone());
        Ok(member)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<WorkspaceWithRole>> {
        let state = self.read()?;
        let mut list: Vec<WorkspaceWithRole> = state
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                state.workspaces.get(&m.workspace_id).map(|w| WorkspaceWithRole {
                    workspace: w.clone(),
                    role: m.role,
                })
            })
            .collect();
        list.sort_by_key(|w| w.workspace.created_at);
        Ok(list)
    }

    async fn list_members(&self, workspace_id: Uuid) -> AppResult<Vec<WorkspaceMember>> {
        Ok(self
            .read()?
            .members
            .iter()
            .filter(|m| m.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn rename(&self, id: Uuid, name: &str) -> AppResult<Workspace> {
        let mut state = self.write()?;
        let workspace = state
            .workspaces
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Workspace {id} not found")))?;
        workspace.name = name.to_string();
        workspace.updated_at = Utc::now();
        Ok(workspace.clone())
    }

    async fn set_invite_code(&self, id: Uuid, code: &str) -> AppResult<Workspace> {
        let mut state = self.write()?;
        let code = normalize_invite_code(code);
        if state
            .workspaces
            .values()
            .any(|w| w.id != id && w.invite_code == code)
        {
            return Err(AppError::conflict("Invite code already in use"));
        }
        let workspace = state
            .workspaces
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Workspace {id} not found")))?;
        workspace.invite_code = code;
        workspace.updated_at = Utc::now();
        Ok(workspace.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperhub_core::error::ErrorKind;
    use paperhub_entity::job::JobType;
    use paperhub_entity::summary::SummaryStyle;

    async fn seed_file(store: &MemoryStore, user_id: Uuid, folder_id: Option<Uuid>) -> File {
        let upload_id = Uuid::new_v4();
        PendingUploadRepository::create(
            store,
            &CreatePendingUpload {
                id: upload_id,
                user_id,
                workspace_id: None,
                folder_id,
                filename: "a.pdf".into(),
                file_size: 10,
                content_type: "application/pdf".into(),
                storage_path: format!("users/{user_id}/files/{upload_id}.pdf"),
                expires_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        store
            .promote(
                upload_id,
                &CreateFile {
                    user_id,
                    workspace_id: None,
                    folder_id,
                    filename: "a.pdf".into(),
                    original_filename: "A.pdf".into(),
                    storage_path: format!("users/{user_id}/files/{upload_id}.pdf"),
                    mime_type: "application/pdf".into(),
                    file_size: 10,
                    page_count: None,
                },
            )
            .await
            .unwrap()
            .unwrap()
    }

    fn summarize(file_id: Uuid) -> CreateJob {
        CreateJob {
            file_id,
            job_type: JobType::Summarize,
            style: SummaryStyle::Academic,
            custom_instructions: None,
            language: "en".into(),
        }
    }

    fn new_summary(file_id: Uuid) -> NewSummary {
        NewSummary {
            file_id,
            title: None,
            content: "text".into(),
            style: SummaryStyle::Paragraph,
            custom_instructions: None,
            model_used: Some("m".into()),
            prompt_tokens: None,
            completion_tokens: None,
            processing_duration_ms: None,
            language: "en".into(),
        }
    }

    #[tokio::test]
    async fn test_promote_creates_uploaded_file() {
        let store = MemoryStore::new();
        let file = seed_file(&store, Uuid::new_v4(), None).await;
        assert_eq!(file.status, ProcessingStatus::Uploaded);
        assert_eq!(store.counts().unwrap().pending_uploads, 0);
    }

    #[tokio::test]
    async fn test_second_live_job_is_rejected() {
        let store = MemoryStore::new();
        let file = seed_file(&store, Uuid::new_v4(), None).await;
        JobRepository::create(&store, &summarize(file.id))
            .await
            .unwrap();
        let err = JobRepository::create(&store, &summarize(file.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyProcessing);
    }

    #[tokio::test]
    async fn test_finalize_success_requires_live_job() {
        let store = MemoryStore::new();
        let file = seed_file(&store, Uuid::new_v4(), None).await;
        let job = JobRepository::create(&store, &summarize(file.id))
            .await
            .unwrap();

        let first = store
            .finalize_success(job.id, &new_summary(file.id))
            .await
            .unwrap();
        assert_eq!(first.unwrap().version, 1);

        let replay = store
            .finalize_success(job.id, &new_summary(file.id))
            .await
            .unwrap();
        assert!(replay.is_none());
        assert_eq!(store.history(file.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascade_removes_files_and_summaries() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let folder = FolderRepository::create(
            &store,
            &CreateFolder {
                user_id: user,
                workspace_id: None,
                parent_id: None,
                name: "Docs".into(),
                path: "/Docs".into(),
                depth: 0,
                sort_order: 0,
            },
        )
        .await
        .unwrap();
        let file = seed_file(&store, user, Some(folder.id)).await;
        let job = JobRepository::create(&store, &summarize(file.id))
            .await
            .unwrap();
        store
            .finalize_success(job.id, &new_summary(file.id))
            .await
            .unwrap();

        let deleted = store.delete_cascade(folder.id).await.unwrap();
        assert_eq!(deleted.folders_deleted, 1);
        assert_eq!(deleted.files.len(), 1);
        assert_eq!(store.counts().unwrap(), MemoryCounts::default());
    }

    async fn seed_folder(store: &MemoryStore, user: Uuid, parent: Option<&Folder>, name: &str) -> Folder {
        FolderRepository::create(
            store,
            &CreateFolder {
                user_id: user,
                workspace_id: None,
                parent_id: parent.map(|p| p.id),
                name: name.into(),
                path: Folder::path_under(parent, name),
                depth: Folder::depth_under(parent),
                sort_order: 0,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_update_subtree_rejects_cycle_and_keeps_rows() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let a = seed_folder(&store, user, None, "A").await;
        let b = seed_folder(&store, user, Some(&a), "B").await;

        // A stale view of the hierarchy that still shows B as a root.
        let mut a_under_b = a.clone();
        a_under_b.parent_id = Some(b.id);
        a_under_b.path = "/B/A".into();
        a_under_b.depth = 1;

        let err = store.update_subtree(&[a_under_b]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        let stored = FolderRepository::find_by_id(&store, a.id).await.unwrap().unwrap();
        assert_eq!(stored.parent_id, None);
        assert_eq!(stored.path, "/A");
    }

    #[tokio::test]
    async fn test_delete_cascade_resolves_whole_subtree() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let root = seed_folder(&store, user, None, "Root").await;
        let child = seed_folder(&store, user, Some(&root), "Child").await;
        let grandchild = seed_folder(&store, user, Some(&child), "Grandchild").await;
        let keep = seed_folder(&store, user, None, "Keep").await;
        seed_file(&store, user, Some(grandchild.id)).await;
        seed_file(&store, user, Some(keep.id)).await;

        let deleted = store.delete_cascade(root.id).await.unwrap();

        assert_eq!(deleted.folders_deleted, 3);
        assert_eq!(deleted.files.len(), 1);
        assert_eq!(deleted.files[0].folder_id, Some(grandchild.id));
        let counts = store.counts().unwrap();
        assert_eq!((counts.folders, counts.files), (1, 1));
    }
}
