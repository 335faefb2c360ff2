//! File lifecycle services: presigned uploads, file management and export.

pub mod export;
pub mod naming;
pub mod service;
pub mod upload;

pub use export::{ExportDocument, ExportRequest, ExportService};
pub use service::{
    FileDetail, FileService, ListFilesParams, MoveFileRequest, RenameFileRequest,
};
pub use upload::{IssueUploadRequest, IssuedUpload, SweepReport, UploadService};
