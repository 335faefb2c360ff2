//! # paperhub-service
//!
//! Business logic service layer for PaperHub. Each service orchestrates
//! repositories, the storage gateway, and the summary dispatcher to
//! implement one part of the document lifecycle.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod access;
pub mod context;
pub mod file;
pub mod folder;
pub mod locks;
pub mod summary;
pub mod workspace;

pub use access::WorkspaceAccess;
pub use context::RequestContext;
pub use file::{ExportService, FileService, UploadService};
pub use folder::{FolderService, TreeService};
pub use locks::KeyedLocks;
pub use summary::{ChannelDispatcher, SummaryDispatcher, SummaryRequest, SummaryService};
pub use workspace::WorkspaceService;
