//! Workspace membership and settings.

pub mod service;

pub use service::{
    CreateWorkspaceRequest, JoinWorkspaceRequest, RenameWorkspaceRequest, WorkspaceService,
    WorkspaceView,
};
