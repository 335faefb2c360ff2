//! File domain entities.

pub mod export;
pub mod model;
pub mod pending;
pub mod query;
pub mod status;

pub use export::{ExportFormat, ExportRow};
pub use model::{CreateFile, File, FileListItem};
pub use pending::{CreatePendingUpload, PendingUpload};
pub use query::{FileFilter, FileQuery, FileSort};
pub use status::ProcessingStatus;
