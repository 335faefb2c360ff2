//! Object storage configuration.

use serde::{Deserialize, Serialize};

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage provider to use: `"local"`, `"s3"`, or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Bucket receiving presigned client uploads.
    #[serde(default = "default_uploads_bucket")]
    pub uploads_bucket: String,
    /// Bucket holding confirmed documents.
    #[serde(default = "default_files_bucket")]
    pub files_bucket: String,
    /// Lifetime of presigned URLs in minutes.
    #[serde(default = "default_presign_expiry")]
    pub presign_expiry_minutes: i64,
    /// Local filesystem storage configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,
    /// S3-compatible storage configuration.
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            uploads_bucket: default_uploads_bucket(),
            files_bucket: default_files_bucket(),
            presign_expiry_minutes: default_presign_expiry(),
            local: LocalStorageConfig::default(),
            s3: S3StorageConfig::default(),
        }
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Root path; each bucket is a subdirectory.
    #[serde(default = "default_local_root")]
    pub root_path: String,
    /// Base URL the presigned links are issued against.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Secret used to sign presigned links.
    #[serde(default = "default_signing_secret")]
    pub signing_secret: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_local_root(),
            public_base_url: default_public_base_url(),
            signing_secret: default_signing_secret(),
        }
    }
}

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StorageConfig {
    /// S3 endpoint URL (for non-AWS services like MinIO).
    #[serde(default)]
    pub endpoint: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Access key ID.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
    /// Use path-style addressing (required by MinIO).
    #[serde(default = "default_true")]
    pub force_path_style: bool,
}

impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_region(),
            access_key: String::new(),
            secret_key: String::new(),
            force_path_style: true,
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}

fn default_uploads_bucket() -> String {
    "uploads".to_string()
}

fn default_files_bucket() -> String {
    "files".to_string()
}

fn default_presign_expiry() -> i64 {
    15
}

fn default_local_root() -> String {
    "./data/storage".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080/storage".to_string()
}

fn default_signing_secret() -> String {
    "change-me".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_true() -> bool {
    true
}
