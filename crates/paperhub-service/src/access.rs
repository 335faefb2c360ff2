//! Workspace access filter.
//!
//! Resolves which owner scope a request operates in and whether a caller
//! may see a given folder, file or upload. Rows the caller may not see are
//! reported as missing, never as forbidden.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_database::repositories::WorkspaceRepository;
use paperhub_entity::OwnerScope;
use paperhub_entity::workspace::WorkspaceMember;

use crate::context::RequestContext;

/// Resolves effective scopes from workspace membership.
#[derive(Clone)]
pub struct WorkspaceAccess {
    /// Workspace repository.
    workspaces: Arc<dyn WorkspaceRepository>,
}

impl std::fmt::Debug for WorkspaceAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceAccess").finish()
    }
}

impl WorkspaceAccess {
    /// Creates a new access filter.
    pub fn new(workspaces: Arc<dyn WorkspaceRepository>) -> Self {
        Self { workspaces }
    }

    /// The scope a request lists and creates in.
    ///
    /// A requested workspace is honoured only for members; everyone else
    /// falls back to their personal scope.
    pub async fn resolve_scope(&self, ctx: &RequestContext) -> AppResult<OwnerScope> {
        let personal = OwnerScope::Personal {
            user_id: ctx.user_id,
        };
        let Some(workspace_id) = ctx.workspace_id else {
            return Ok(personal);
        };

        match self.workspaces.find_member(workspace_id, ctx.user_id).await? {
            Some(_) => Ok(OwnerScope::Workspace { workspace_id }),
            None => {
                debug!(
                    user_id = %ctx.user_id,
                    workspace_id = %workspace_id,
                    "Caller is not a workspace member, using personal scope"
                );
                Ok(personal)
            }
        }
    }

    /// Whether the caller may act on a row owned by `owner_id` in
    /// `workspace_id`.
    ///
    /// Workspace rows require membership; personal rows require ownership.
    pub async fn can_access(
        &self,
        ctx: &RequestContext,
        owner_id: Uuid,
        workspace_id: Option<Uuid>,
    ) -> AppResult<bool> {
        match workspace_id {
            Some(workspace_id) => Ok(self
                .workspaces
                .find_member(workspace_id, ctx.user_id)
                .await?
                .is_some()),
            None => Ok(owner_id == ctx.user_id),
        }
    }

    /// Fail with `NotFound` unless the caller may act on the row.
    pub async fn ensure_access(
        &self,
        ctx: &RequestContext,
        owner_id: Uuid,
        workspace_id: Option<Uuid>,
        not_found: &str,
    ) -> AppResult<()> {
        if self.can_access(ctx, owner_id, workspace_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(not_found))
        }
    }

    /// The caller's membership of a workspace, or `NotFound`.
    pub async fn require_member(
        &self,
        ctx: &RequestContext,
        workspace_id: Uuid,
    ) -> AppResult<WorkspaceMember> {
        self.workspaces
            .find_member(workspace_id, ctx.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Workspace not found"))
    }
}
