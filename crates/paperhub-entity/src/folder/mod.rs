//! Folder domain entities.

pub mod model;
pub mod tree;

pub use model::{CreateFolder, Folder, FolderStats, FolderWithStats};
pub use tree::{FolderNode, FolderTree};
