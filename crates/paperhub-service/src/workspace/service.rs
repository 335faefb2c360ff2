//! Workspace creation, membership and owner-only settings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use paperhub_core::error::{AppError, ErrorKind};
use paperhub_core::result::AppResult;
use paperhub_database::repositories::WorkspaceRepository;
use paperhub_entity::workspace::{
    Workspace, WorkspaceMember, WorkspaceRole, normalize_invite_code,
};

use crate::access::WorkspaceAccess;
use crate::context::RequestContext;

/// Attempts at finding an unused invite code before giving up.
const INVITE_CODE_ATTEMPTS: usize = 5;

/// Manages workspaces and their members.
#[derive(Clone)]
pub struct WorkspaceService {
    /// Workspace repository.
    workspaces: Arc<dyn WorkspaceRepository>,
    /// Access filter.
    access: WorkspaceAccess,
}

impl std::fmt::Debug for WorkspaceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceService").finish()
    }
}

/// Request to create a workspace.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateWorkspaceRequest {
    /// Display name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Request to rename a workspace.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenameWorkspaceRequest {
    /// New display name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Request to join a workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinWorkspaceRequest {
    /// Invite code, matched case-insensitively.
    pub invite_code: String,
}

/// A workspace as shown to one of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceView {
    /// Workspace ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Invite code, only for owners and admins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    /// Owning user.
    pub owner_id: Uuid,
    /// The viewer's role.
    pub role: WorkspaceRole,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl WorkspaceView {
    fn new(workspace: Workspace, role: WorkspaceRole) -> Self {
        Self {
            id: workspace.id,
            name: workspace.name,
            invite_code: role.can_view_invite_code().then_some(workspace.invite_code),
            owner_id: workspace.owner_id,
            role,
            created_at: workspace.created_at,
            updated_at: workspace.updated_at,
        }
    }
}

/// A fresh 8-character uppercase hexadecimal invite code.
fn generate_invite_code() -> String {
    format!("{:08X}", rand::random::<u32>())
}

impl WorkspaceService {
    /// Creates a new workspace service.
    pub fn new(workspaces: Arc<dyn WorkspaceRepository>, access: WorkspaceAccess) -> Self {
        Self { workspaces, access }
    }

    /// Creates a workspace owned by the caller.
    pub async fn create_workspace(
        &self,
        ctx: &RequestContext,
        req: CreateWorkspaceRequest,
    ) -> AppResult<WorkspaceView> {
        req.validate()?;
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::invalid_field("name", "Workspace name cannot be empty"));
        }

        for attempt in 1..=INVITE_CODE_ATTEMPTS {
            let code = generate_invite_code();
            match self.workspaces.create(name, &code, ctx.user_id).await {
                Ok(workspace) => {
                    info!(
                        user_id = %ctx.user_id,
                        workspace_id = %workspace.id,
                        "Workspace created"
                    );
                    return Ok(WorkspaceView::new(workspace, WorkspaceRole::Owner));
                }
                Err(e) if e.is(ErrorKind::Conflict) => {
                    warn!(attempt, "Invite code collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::conflict("Could not allocate a unique invite code"))
    }

    /// Workspaces the caller belongs to.
    pub async fn list_workspaces(&self, ctx: &RequestContext) -> AppResult<Vec<WorkspaceView>> {
        let workspaces = self.workspaces.list_for_user(ctx.user_id).await?;
        Ok(workspaces
            .into_iter()
            .map(|w| WorkspaceView::new(w.workspace, w.role))
            .collect())
    }

    /// One workspace the caller belongs to.
    pub async fn get_workspace(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
    ) -> AppResult<WorkspaceView> {
        let member = self.access.require_member(ctx, workspace_id).await?;
        let workspace = self.find(workspace_id).await?;
        Ok(WorkspaceView::new(workspace, member.role))
    }

    /// Joins the workspace matching an invite code.
    pub async fn join_workspace(
        &self,
        ctx: &RequestContext,
        req: JoinWorkspaceRequest,
    ) -> AppResult<WorkspaceView> {
        let code = normalize_invite_code(&req.invite_code);
        if code.is_empty() {
            return Err(AppError::invite_code_invalid());
        }

        let workspace = self
            .workspaces
            .find_by_invite_code(&code)
            .await?
            .ok_or_else(AppError::invite_code_invalid)?;

        if self
            .workspaces
            .find_member(workspace.id, ctx.user_id)
            .await?
            .is_some()
        {
            return Err(AppError::already_member());
        }

        let member = self
            .workspaces
            .add_member(workspace.id, ctx.user_id, WorkspaceRole::Member)
            .await?;

        info!(
            user_id = %ctx.user_id,
            workspace_id = %workspace.id,
            "Joined workspace"
        );

        Ok(WorkspaceView::new(workspace, member.role))
    }

    /// Members of a workspace the caller belongs to.
    pub async fn list_members(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
    ) -> AppResult<Vec<WorkspaceMember>> {
        self.access.require_member(ctx, workspace_id).await?;
        self.workspaces.list_members(workspace_id).await
    }

    /// Renames a workspace. Owner only.
    pub async fn rename_workspace(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
        req: RenameWorkspaceRequest,
    ) -> AppResult<WorkspaceView> {
        req.validate()?;
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::invalid_field("name", "Workspace name cannot be empty"));
        }
        self.require_owner(ctx, workspace_id).await?;

        let workspace = self.workspaces.rename(workspace_id, name).await?;
        info!(
            user_id = %ctx.user_id,
            workspace_id = %workspace_id,
            name = %workspace.name,
            "Workspace renamed"
        );
        Ok(WorkspaceView::new(workspace, WorkspaceRole::Owner))
    }

    /// Replaces the invite code. Owner only.
    pub async fn regenerate_invite_code(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
    ) -> AppResult<WorkspaceView> {
        self.require_owner(ctx, workspace_id).await?;

        for attempt in 1..=INVITE_CODE_ATTEMPTS {
            let code = generate_invite_code();
            match self.workspaces.set_invite_code(workspace_id, &code).await {
                Ok(workspace) => {
                    info!(
                        user_id = %ctx.user_id,
                        workspace_id = %workspace_id,
                        "Invite code regenerated"
                    );
                    return Ok(WorkspaceView::new(workspace, WorkspaceRole::Owner));
                }
                Err(e) if e.is(ErrorKind::Conflict) => {
                    warn!(attempt, "Invite code collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::conflict("Could not allocate a unique invite code"))
    }

    async fn find(&self, workspace_id: Uuid) -> AppResult<Workspace> {
        self.workspaces
            .find_by_id(workspace_id)
            .await?
            .ok_or_else(|| AppError::not_found("Workspace not found"))
    }

    /// `NotFound` for non-members, `Forbidden` for members who do not own it.
    async fn require_owner(&self, ctx: &RequestContext, workspace_id: Uuid) -> AppResult<()> {
        let member = self.access.require_member(ctx, workspace_id).await?;
        if member.role != WorkspaceRole::Owner {
            return Err(AppError::forbidden(
                "Only the workspace owner can change workspace settings",
            ));
        }
        Ok(())
    }
}
