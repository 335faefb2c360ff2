//! Repository traits and their PostgreSQL implementations.
//!
//! Services depend on the traits only; [`Repositories`] bundles one
//! implementation of each, either PostgreSQL-backed or in-memory.

pub mod file;
pub mod folder;
pub mod job;
pub mod pending;
pub mod summary;
pub mod workspace;

use std::sync::Arc;

use sqlx::PgPool;

use paperhub_core::error::{AppError, ErrorKind};

use crate::memory::MemoryStore;

pub use file::{FileRepository, PgFileRepository};
pub use folder::{CascadeDelete, FolderRepository, PgFolderRepository};
pub use job::{JobRepository, PgJobRepository};
pub use pending::{PendingUploadRepository, PgPendingUploadRepository};
pub use summary::{PgSummaryRepository, SummaryRepository};
pub use workspace::{PgWorkspaceRepository, WorkspaceRepository};

/// One handle per repository, shared by all services.
#[derive(Clone)]
pub struct Repositories {
    /// Folder rows.
    pub folders: Arc<dyn FolderRepository>,
    /// File rows.
    pub files: Arc<dyn FileRepository>,
    /// Pending upload rows.
    pub pending_uploads: Arc<dyn PendingUploadRepository>,
    /// Processing job rows.
    pub jobs: Arc<dyn JobRepository>,
    /// Summary rows.
    pub summaries: Arc<dyn SummaryRepository>,
    /// Workspace and membership rows.
    pub workspaces: Arc<dyn WorkspaceRepository>,
}

impl Repositories {
    /// PostgreSQL-backed repositories sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            folders: Arc::new(PgFolderRepository::new(pool.clone())),
            files: Arc::new(PgFileRepository::new(pool.clone())),
            pending_uploads: Arc::new(PgPendingUploadRepository::new(pool.clone())),
            jobs: Arc::new(PgJobRepository::new(pool.clone())),
            summaries: Arc::new(PgSummaryRepository::new(pool.clone())),
            workspaces: Arc::new(PgWorkspaceRepository::new(pool)),
        }
    }

    /// Repositories backed by a single in-memory store.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            folders: store.clone(),
            files: store.clone(),
            pending_uploads: store.clone(),
            jobs: store.clone(),
            summaries: store.clone(),
            workspaces: store,
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}

/// SQL predicate restricting `alias` rows to an owner scope.
///
/// `$user` and `$ws` are the parameter positions bound from
/// [`paperhub_entity::OwnerScope::sql_binds`].
pub(crate) fn scope_predicate(alias: &str, user: usize, ws: usize) -> String {
    format!(
        "(({alias}.workspace_id = ${ws}) OR (${ws}::uuid IS NULL AND {alias}.workspace_id IS NULL AND {alias}.user_id = ${user}))"
    )
}

/// Whether an error is a unique violation of the named constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

/// Map a sqlx error into a database [`AppError`].
pub(crate) fn db_error(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_predicate_positions() {
        let sql = scope_predicate("f", 1, 2);
        assert!(sql.contains("f.workspace_id = $2"));
        assert!(sql.contains("f.user_id = $1"));
        assert!(sql.contains("$2::uuid IS NULL"));
    }
}
