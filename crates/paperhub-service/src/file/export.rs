//! File export to CSV and JSON.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use paperhub_core::result::AppResult;
use paperhub_database::repositories::{FileRepository, WorkspaceRepository};
use paperhub_entity::OwnerScope;
use paperhub_entity::file::export::PERSONAL_WORKSPACE_LABEL;
use paperhub_entity::file::{ExportFormat, ExportRow};

use super::naming::export_stem;
use super::service::ListFilesParams;
use crate::access::WorkspaceAccess;
use crate::context::RequestContext;

/// UTF-8 byte order mark, so spreadsheet tools detect the encoding.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Download name used unless a single file is exported.
const DEFAULT_EXPORT_STEM: &str = "files_export";

const CSV_HEADERS: [&str; 15] = [
    "File ID",
    "Filename",
    "Original Filename",
    "Size (Bytes)",
    "Page Count",
    "Type",
    "Uploaded At",
    "Status",
    "Workspace",
    "Folder",
    "Summary Version",
    "Summary Model",
    "Summary Created At",
    "Summary Processing Duration (ms)",
    "Summary Content",
];

/// Exports file listings with their summaries.
#[derive(Clone)]
pub struct ExportService {
    /// File repository.
    files: Arc<dyn FileRepository>,
    /// Workspace repository, for the document header.
    workspaces: Arc<dyn WorkspaceRepository>,
    /// Access filter.
    access: WorkspaceAccess,
}

impl std::fmt::Debug for ExportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportService").finish()
    }
}

/// What to export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Listing filters; ignored when `file_ids` is non-empty.
    #[serde(flatten)]
    pub params: ListFilesParams,
    /// Explicit file selection.
    pub file_ids: Option<Vec<Uuid>>,
    /// Output format, `csv` by default.
    pub format: Option<String>,
}

/// A serialized export ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    /// Suggested download filename.
    pub filename: String,
    /// MIME type of `body`.
    pub content_type: &'static str,
    /// Serialized bytes.
    pub body: Vec<u8>,
}

/// Structured export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    /// When the export was produced.
    pub exported_at: DateTime<Utc>,
    /// Workspace name, or `Personal`.
    pub workspace: String,
    /// Number of files in `files`.
    pub total_files: usize,
    /// Exported files.
    pub files: Vec<ExportFile>,
}

/// One file in a structured export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFile {
    pub id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub size_bytes: i64,
    pub page_count: Option<i32>,
    pub mime_type: String,
    pub status: String,
    pub uploaded_at: DateTime<Utc>,
    pub folder: String,
    /// Every summary version, newest first.
    pub summaries: Vec<ExportFileSummary>,
}

/// One summary version in a structured export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFileSummary {
    pub version: i32,
    pub model: String,
    pub created_at: Option<DateTime<Utc>>,
    pub content: String,
    pub processing_duration_ms: i32,
}

impl ExportService {
    /// Creates a new export service.
    pub fn new(
        files: Arc<dyn FileRepository>,
        workspaces: Arc<dyn WorkspaceRepository>,
        access: WorkspaceAccess,
    ) -> Self {
        Self {
            files,
            workspaces,
            access,
        }
    }

    /// Exports the caller's files.
    ///
    /// An explicit id list replaces the listing filters but is still
    /// restricted to the caller's effective scope.
    pub async fn export(
        &self,
        ctx: &RequestContext,
        req: &ExportRequest,
    ) -> AppResult<ExportDocument> {
        let format = match req.format.as_deref().map(str::trim) {
            None | Some("") => ExportFormat::default(),
            Some(raw) => raw.parse::<ExportFormat>()?,
        };
        let filter = req.params.filter()?;
        let ids = req.file_ids.as_deref().filter(|ids| !ids.is_empty());

        let scope = self.access.resolve_scope(ctx).await?;
        let rows = self.files.export(&scope, &filter, ids).await?;

        let now = Utc::now();
        let stem = match ids {
            Some([single]) => rows
                .iter()
                .find(|r| r.id == *single)
                .map(|r| export_stem(&r.original_filename))
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_EXPORT_STEM.to_string()),
            _ => DEFAULT_EXPORT_STEM.to_string(),
        };
        let filename = format!(
            "{stem}_{}.{}",
            now.format("%Y-%m-%d_%H-%M-%S"),
            format.extension()
        );

        let body = match format {
            ExportFormat::Csv => render_csv(&rows),
            ExportFormat::Json => {
                let workspace = self.workspace_label(&scope).await?;
                serde_json::to_vec_pretty(&build_export_data(&rows, workspace, now))?
            }
        };

        info!(
            user_id = %ctx.user_id,
            format = %format,
            rows = rows.len(),
            bytes = body.len(),
            "Files exported"
        );

        Ok(ExportDocument {
            filename,
            content_type: format.content_type(),
            body,
        })
    }

    async fn workspace_label(&self, scope: &OwnerScope) -> AppResult<String> {
        match scope.workspace_id() {
            Some(id) => Ok(self
                .workspaces
                .find_by_id(id)
                .await?
                .map(|w| w.name)
                .unwrap_or_else(|| PERSONAL_WORKSPACE_LABEL.to_string())),
            None => Ok(PERSONAL_WORKSPACE_LABEL.to_string()),
        }
    }
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// CSV with a BOM, a header row, and one row per file carrying its most
/// recent summary.
fn render_csv(rows: &[ExportRow]) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&CSV_HEADERS.map(escape_csv).join(","));
    out.push_str("\r\n");

    let mut seen = std::collections::HashSet::new();
    for row in rows {
        // Rows arrive newest version first within each file.
        if !seen.insert(row.id) {
            continue;
        }
        let mut fields = vec![
            row.id.to_string(),
            row.filename.clone(),
            row.original_filename.clone(),
            row.file_size.to_string(),
            row.page_count.map(|p| p.to_string()).unwrap_or_default(),
            row.mime_type.clone(),
            rfc3339(row.uploaded_at),
            row.status.to_string(),
            row.workspace_name.clone(),
            row.folder_path.clone(),
        ];
        match row.summary_version {
            Some(version) => fields.extend([
                version.to_string(),
                row.summary_model.clone().unwrap_or_default(),
                row.summary_created_at.map(rfc3339).unwrap_or_default(),
                row.summary_duration_ms
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                row.summary_content.clone().unwrap_or_default(),
            ]),
            None => fields.extend(std::iter::repeat_n(String::new(), 5)),
        }
        let line: Vec<String> = fields.iter().map(|f| escape_csv(f)).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }

    let mut body = Vec::with_capacity(UTF8_BOM.len() + out.len());
    body.extend_from_slice(UTF8_BOM);
    body.extend_from_slice(out.as_bytes());
    body
}

/// Group joined rows into one entry per file, keeping row order.
fn build_export_data(rows: &[ExportRow], workspace: String, now: DateTime<Utc>) -> ExportData {
    let mut files: Vec<ExportFile> = Vec::new();
    let mut position: HashMap<Uuid, usize> = HashMap::new();

    for row in rows {
        let idx = *position.entry(row.id).or_insert_with(|| {
            files.push(ExportFile {
                id: row.id,
                filename: row.filename.clone(),
                original_filename: row.original_filename.clone(),
                size_bytes: row.file_size,
                page_count: row.page_count,
                mime_type: row.mime_type.clone(),
                status: row.status.to_string(),
                uploaded_at: row.uploaded_at,
                folder: row.folder_path.clone(),
                summaries: Vec::new(),
            });
            files.len() - 1
        });

        if let Some(version) = row.summary_version {
            files[idx].summaries.push(ExportFileSummary {
                version,
                model: row.summary_model.clone().unwrap_or_default(),
                created_at: row.summary_created_at,
                content: row.summary_content.clone().unwrap_or_default(),
                processing_duration_ms: row.summary_duration_ms.unwrap_or(0),
            });
        }
    }

    ExportData {
        exported_at: now,
        workspace,
        total_files: files.len(),
        files,
    }
}
