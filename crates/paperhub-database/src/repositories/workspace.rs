//! Workspace and membership repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_entity::workspace::{
    Workspace, WorkspaceMember, WorkspaceRole, WorkspaceWithRole,
};

use super::{db_error, is_unique_violation};

/// Unique index on the uppercase invite code.
pub const INVITE_CODE_INDEX: &str = "workspaces_invite_code_key";
/// Primary key of the membership table.
pub const MEMBERSHIP_KEY: &str = "workspace_members_pkey";

/// Persistence for workspaces and their members.
#[async_trait]
pub trait WorkspaceRepository: Send + Sync + 'static {
    /// Create a workspace and enrol `owner_id` as its owner.
    ///
    /// Fails with `Conflict` when the invite code is taken.
    async fn create(&self, name: &str, invite_code: &str, owner_id: Uuid) -> AppResult<Workspace>;

    /// Find a workspace by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Workspace>>;

    /// Find a workspace by its (already normalized) invite code.
    async fn find_by_invite_code(&self, code: &str) -> AppResult<Option<Workspace>>;

    /// Membership of a user, if any.
    async fn find_member(&self, workspace_id: Uuid, user_id: Uuid)
    -> AppResult<Option<WorkspaceMember>>;

    /// Add a member. Fails with `AlreadyMember` on duplicates.
    async fn add_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
    ) -> AppResult<WorkspaceMember>;

    /// Workspaces a user belongs to, with their role.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<WorkspaceWithRole>>;

    /// Members of a workspace.
    async fn list_members(&self, workspace_id: Uuid) -> AppResult<Vec<WorkspaceMember>>;

    /// Change the workspace name.
    async fn rename(&self, id: Uuid, name: &str) -> AppResult<Workspace>;

    /// Replace the invite code. Fails with `Conflict` when taken.
    async fn set_invite_code(&self, id: Uuid, code: &str) -> AppResult<Workspace>;
}

/// PostgreSQL workspace repository.
#[derive(Debug, Clone)]
pub struct PgWorkspaceRepository {
    pool: PgPool,
}

impl PgWorkspaceRepository {
    /// Create a new workspace repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn invite_code_error(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e, INVITE_CODE_INDEX) {
        AppError::conflict("Invite code already in use")
    } else {
        db_error("Failed to write workspace")(e)
    }
}

#[async_trait]
impl WorkspaceRepository for PgWorkspaceRepository {
    async fn create(&self, name: &str, invite_code: &str, owner_id: Uuid) -> AppResult<Workspace> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let workspace = sqlx::query_as::<_, Workspace>(
            "INSERT INTO workspaces (name, invite_code, owner_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(invite_code)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(invite_code_error)?;

        sqlx::query(
            "INSERT INTO workspace_members (workspace_id, user_id, role) VALUES ($1, $2, 'owner')",
        )
        .bind(workspace.id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to add workspace owner"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit workspace"))?;
        Ok(workspace)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Workspace>> {
        sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find workspace"))
    }

    async fn find_by_invite_code(&self, code: &str) -> AppResult<Option<Workspace>> {
        sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE UPPER(invite_code) = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find workspace by invite code"))
    }

    async fn find_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<WorkspaceMember>> {
        sqlx::query_as::<_, WorkspaceMember>(
            "SELECT * FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find workspace member"))
    }

    async fn add_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
    ) -> AppResult<WorkspaceMember> {
        sqlx::query_as::<_, WorkspaceMember>(
            "INSERT INTO workspace_members (workspace_id, user_id, role) VALUES ($1, $2, $3) \
             RETURNING *",
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, MEMBERSHIP_KEY) {
                AppError::already_member()
            } else {
                db_error("Failed to add workspace member")(e)
            }
        })
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<WorkspaceWithRole>> {
        sqlx::query_as::<_, WorkspaceWithRole>(
            "SELECT w.*, m.role FROM workspaces w \
             JOIN workspace_members m ON m.workspace_id = w.id \
             WHERE m.user_id = $1 ORDER BY w.created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list workspaces"))
    }

    async fn list_members(&self, workspace_id: Uuid) -> AppResult<Vec<WorkspaceMember>> {
        sqlx::query_as::<_, WorkspaceMember>(
            "SELECT * FROM workspace_members WHERE workspace_id = $1 ORDER BY joined_at ASC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list workspace members"))
    }

    async fn rename(&self, id: Uuid, name: &str) -> AppResult<Workspace> {
        sqlx::query_as::<_, Workspace>(
            "UPDATE workspaces SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to rename workspace"))?
        .ok_or_else(|| AppError::not_found(format!("Workspace {id} not found")))
    }

    async fn set_invite_code(&self, id: Uuid, code: &str) -> AppResult<Workspace> {
        sqlx::query_as::<_, Workspace>(
            "UPDATE workspaces SET invite_code = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(invite_code_error)?
        .ok_or_else(|| AppError::not_found(format!("Workspace {id} not found")))
    }
}
