//! Workspace domain entities.

pub mod model;

pub use model::{
    Workspace, WorkspaceMember, WorkspaceRole, WorkspaceWithRole, normalize_invite_code,
};
