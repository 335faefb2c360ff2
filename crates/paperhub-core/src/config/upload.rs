//! Presigned upload configuration.

use serde::{Deserialize, Serialize};

/// Limits applied when issuing presigned uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted document size in megabytes.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    /// The only content type accepted for uploads.
    #[serde(default = "default_content_type")]
    pub accepted_content_type: String,
    /// Extension used when the original filename has none.
    #[serde(default = "default_extension")]
    pub default_extension: String,
    /// Grace period after expiry before the reaper removes a pending upload.
    #[serde(default = "default_retention_hours")]
    pub pending_retention_hours: i64,
}

impl UploadConfig {
    /// Maximum size in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
            accepted_content_type: default_content_type(),
            default_extension: default_extension(),
            pending_retention_hours: default_retention_hours(),
        }
    }
}

fn default_max_file_size_mb() -> u64 {
    25
}

fn default_content_type() -> String {
    "application/pdf".to_string()
}

fn default_extension() -> String {
    ".pdf".to_string()
}

fn default_retention_hours() -> i64 {
    24
}
