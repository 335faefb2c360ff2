//! File listing query parameters.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use paperhub_core::types::{PageRequest, SortDirection};

use super::model::File;
use super::status::ProcessingStatus;
use crate::scope::OwnerScope;

/// Sort keys accepted by file listings.
///
/// Parsed from an allow-list; anything unrecognized falls back to
/// newest-first by upload time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileSort {
    /// `filename`
    FilenameAsc,
    /// `-filename`
    FilenameDesc,
    /// `uploaded_at`
    UploadedAtAsc,
    /// `-uploaded_at` (default)
    #[default]
    UploadedAtDesc,
    /// `file_size`
    FileSizeAsc,
    /// `-file_size`
    FileSizeDesc,
    /// `page_count`
    PageCountAsc,
    /// `-page_count`
    PageCountDesc,
}

impl FileSort {
    /// Parse a sort key, falling back to the default on anything unknown.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("filename") => Self::FilenameAsc,
            Some("-filename") => Self::FilenameDesc,
            Some("uploaded_at") => Self::UploadedAtAsc,
            Some("file_size") => Self::FileSizeAsc,
            Some("-file_size") => Self::FileSizeDesc,
            Some("page_count") => Self::PageCountAsc,
            Some("-page_count") => Self::PageCountDesc,
            _ => Self::UploadedAtDesc,
        }
    }

    /// Column and direction this key sorts by.
    pub fn column(&self) -> (&'static str, SortDirection) {
        match self {
            Self::FilenameAsc => ("filename", SortDirection::Asc),
            Self::FilenameDesc => ("filename", SortDirection::Desc),
            Self::UploadedAtAsc => ("uploaded_at", SortDirection::Asc),
            Self::UploadedAtDesc => ("uploaded_at", SortDirection::Desc),
            Self::FileSizeAsc => ("file_size", SortDirection::Asc),
            Self::FileSizeDesc => ("file_size", SortDirection::Desc),
            Self::PageCountAsc => ("page_count", SortDirection::Asc),
            Self::PageCountDesc => ("page_count", SortDirection::Desc),
        }
    }

    /// SQL `ORDER BY` clause body (column names come from the allow-list).
    pub fn order_by_sql(&self) -> String {
        let (column, direction) = self.column();
        format!("f.{column} {}, f.id ASC", direction.as_sql())
    }

    /// Compare two files the same way the SQL ordering does.
    pub fn compare(&self, a: &File, b: &File) -> Ordering {
        let (column, direction) = self.column();
        let ordering = match column {
            "filename" => a.filename.cmp(&b.filename),
            "file_size" => a.file_size.cmp(&b.file_size),
            "page_count" => a.page_count.cmp(&b.page_count),
            _ => a.uploaded_at.cmp(&b.uploaded_at),
        };
        direction.apply(ordering).then_with(|| a.id.cmp(&b.id))
    }
}

/// Optional filters shared by listing and export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFilter {
    /// Only files directly in this folder.
    pub folder_id: Option<Uuid>,
    /// Only files in this status.
    pub status: Option<ProcessingStatus>,
    /// Case-insensitive substring over stored and original filename.
    pub search: Option<String>,
}

impl FileFilter {
    /// Normalized search term (trimmed, non-empty).
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// SQL `ILIKE` pattern for the search term, wildcards escaped.
    pub fn search_pattern(&self) -> Option<String> {
        self.search_term().map(|s| {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }

    /// Whether a file passes this filter.
    pub fn matches(&self, file: &File) -> bool {
        if self.folder_id.is_some() && file.folder_id != self.folder_id {
            return false;
        }
        if let Some(status) = self.status {
            if file.status != status {
                return false;
            }
        }
        if let Some(term) = self.search_term() {
            let term = term.to_lowercase();
            return file.filename.to_lowercase().contains(&term)
                || file.original_filename.to_lowercase().contains(&term);
        }
        true
    }
}

/// A fully resolved file listing query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileQuery {
    /// Scope the listing is restricted to.
    pub scope: OwnerScope,
    /// Optional filters.
    pub filter: FileFilter,
    /// Sort key.
    pub sort: FileSort,
    /// Page to return.
    pub page: PageRequest,
}
