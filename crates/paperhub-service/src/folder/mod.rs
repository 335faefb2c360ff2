//! Folder hierarchy and tree services.

mod hierarchy;
pub mod service;
pub mod tree;

pub use service::{
    CreateFolderRequest, FolderDeletion, FolderService, MoveFolderRequest, RenameFolderRequest,
};
pub use tree::{TreeOptions, TreeService, build_tree};
