//! Object storage gateway trait.
//!
//! The gateway exposes the handful of capabilities the document lifecycle
//! relies on: presigned PUT/GET, existence checks, cross-bucket copy, and
//! delete. Implementations live in `paperhub-storage`.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// Logical bucket an object lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Staging area that receives presigned client uploads.
    Uploads,
    /// Permanent home of confirmed documents.
    Files,
}

impl Bucket {
    /// Return the logical bucket name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploads => "uploads",
            Self::Files => "files",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time-boxed URL allowing direct client-to-storage transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedRequest {
    /// The presigned URL.
    pub url: String,
    /// HTTP method the URL is valid for.
    pub method: String,
    /// Instant after which the URL stops working.
    pub expires_at: DateTime<Utc>,
    /// Headers the client must send with the request.
    pub headers: BTreeMap<String, String>,
}

/// Trait for object storage backends.
#[async_trait]
pub trait ObjectStorage: Send + Sync + fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "s3").
    fn provider_type(&self) -> &str;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Write an object.
    async fn put(&self, bucket: Bucket, key: &str, data: Bytes) -> AppResult<()>;

    /// Read an object into memory.
    async fn get(&self, bucket: Bucket, key: &str) -> AppResult<Bytes>;

    /// Check whether an object exists.
    async fn exists(&self, bucket: Bucket, key: &str) -> AppResult<bool>;

    /// Copy an object, possibly across buckets.
    async fn copy(&self, from: Bucket, from_key: &str, to: Bucket, to_key: &str)
    -> AppResult<()>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, bucket: Bucket, key: &str) -> AppResult<()>;

    /// Issue a presigned PUT for a single object of known type and size.
    async fn presign_put(
        &self,
        bucket: Bucket,
        key: &str,
        content_type: &str,
        content_length: u64,
        expires_in: Duration,
    ) -> AppResult<PresignedRequest>;

    /// Issue a presigned GET for an object.
    async fn presign_get(
        &self,
        bucket: Bucket,
        key: &str,
        expires_in: Duration,
    ) -> AppResult<PresignedRequest>;
}
