//! Local filesystem storage provider.
//!
//! Each logical bucket is a subdirectory of the configured root. Presigned
//! links point at `public_base_url` and carry an HMAC-SHA256 signature over
//! the method, object, expiry and (for uploads) the declared content type
//! and length, which the serving edge checks with [`LocalObjectStorage::verify`].

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::fs;
use tracing::debug;

use paperhub_core::config::storage::StorageConfig;
use paperhub_core::error::{AppError, ErrorKind};
use paperhub_core::result::AppResult;
use paperhub_core::traits::{Bucket, ObjectStorage, PresignedRequest};

type HmacSha256 = Hmac<Sha256>;

/// Local filesystem storage provider.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
    uploads_bucket: String,
    files_bucket: String,
    public_base_url: String,
    signing_secret: String,
}

/// Parameters a presigned link was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAccess<'a> {
    /// HTTP method, `PUT` or `GET`.
    pub method: &'a str,
    /// Physical bucket name as it appears in the URL.
    pub bucket: &'a str,
    /// Object key.
    pub key: &'a str,
    /// Unix expiry timestamp.
    pub expires: i64,
    /// Declared content type (uploads only).
    pub content_type: Option<&'a str>,
    /// Declared content length (uploads only).
    pub content_length: Option<u64>,
}

impl LocalObjectStorage {
    /// Create the provider and its bucket directories.
    pub async fn new(config: &StorageConfig) -> AppResult<Self> {
        let storage = Self {
            root: PathBuf::from(&config.local.root_path),
            uploads_bucket: config.uploads_bucket.clone(),
            files_bucket: config.files_bucket.clone(),
            public_base_url: config.local.public_base_url.trim_end_matches('/').to_string(),
            signing_secret: config.local.signing_secret.clone(),
        };

        for bucket in [Bucket::Uploads, Bucket::Files] {
            let dir = storage.root.join(storage.bucket_name(bucket));
            fs::create_dir_all(&dir).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::StorageUnavailable,
                    format!("Failed to create bucket directory: {}", dir.display()),
                    e,
                )
            })?;
        }

        Ok(storage)
    }

    fn bucket_name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Uploads => &self.uploads_bucket,
            Bucket::Files => &self.files_bucket,
        }
    }

    /// Resolve an object key to a path inside the bucket directory.
    fn resolve(&self, bucket: Bucket, key: &str) -> AppResult<PathBuf> {
        let clean = key.trim_start_matches('/');
        let relative = Path::new(clean);
        let escapes = clean.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(AppError::invalid_field("key", format!("Invalid object key: {key}")));
        }
        Ok(self.root.join(self.bucket_name(bucket)).join(relative))
    }

    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::StorageUnavailable,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    fn sign(&self, access: &SignedAccess<'_>) -> AppResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.signing_secret.as_bytes())
            .map_err(|e| AppError::configuration(format!("Invalid signing secret: {e}")))?;
        mac.update(canonical_string(access).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check a signature presented with a presigned link.
    pub fn verify(&self, access: &SignedAccess<'_>, signature: &str, now: DateTime<Utc>) -> bool {
        if now.timestamp() >= access.expires {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(self.signing_secret.as_bytes()) else {
            return false;
        };
        mac.update(canonical_string(access).as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    fn presign(
        &self,
        access: SignedAccess<'_>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<PresignedRequest> {
        let signature = self.sign(&access)?;
        let url = format!(
            "{}/{}/{}?method={}&expires={}&signature={}",
            self.public_base_url,
            access.bucket,
            access.key.trim_start_matches('/'),
            access.method,
            access.expires,
            signature
        );

        let mut headers = BTreeMap::new();
        if let Some(content_type) = access.content_type {
            headers.insert("Content-Type".to_string(), content_type.to_string());
        }
        if let Some(length) = access.content_length {
            headers.insert("Content-Length".to_string(), length.to_string());
        }

        Ok(PresignedRequest {
            url,
            method: access.method.to_string(),
            expires_at,
            headers,
        })
    }
}

fn canonical_string(access: &SignedAccess<'_>) -> String {
    format!(
        "{}\n{}/{}\n{}\n{}\n{}",
        access.method,
        access.bucket,
        access.key.trim_start_matches('/'),
        access.expires,
        access.content_type.unwrap_or_default(),
        access
            .content_length
            .map(|l| l.to_string())
            .unwrap_or_default()
    )
}

fn expiry(expires_in: Duration) -> AppResult<DateTime<Utc>> {
    let delta = chrono::Duration::from_std(expires_in)
        .map_err(|e| AppError::validation(format!("Invalid presign expiry: {e}")))?;
    Ok(Utc::now() + delta)
}

fn io_error(action: &str, key: &str, e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Object not found: {key}"))
    } else {
        AppError::with_source(
            ErrorKind::StorageUnavailable,
            format!("Failed to {action} object: {key}"),
            e,
        )
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn put(&self, bucket: Bucket, key: &str, data: Bytes) -> AppResult<()> {
        let path = self.resolve(bucket, key)?;
        self.ensure_parent(&path).await?;
        fs::write(&path, &data)
            .await
            .map_err(|e| io_error("write", key, e))?;
        debug!(%bucket, key, bytes = data.len(), "Wrote object");
        Ok(())
    }

    async fn get(&self, bucket: Bucket, key: &str) -> AppResult<Bytes> {
        let path = self.resolve(bucket, key)?;
        let data = fs::read(&path).await.map_err(|e| io_error("read", key, e))?;
        Ok(Bytes::from(data))
    }

    async fn exists(&self, bucket: Bucket, key: &str) -> AppResult<bool> {
        let path = self.resolve(bucket, key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("stat", key, e)),
        }
    }

    async fn copy(
        &self,
        from: Bucket,
        from_key: &str,
        to: Bucket,
        to_key: &str,
    ) -> AppResult<()> {
        let source = self.resolve(from, from_key)?;
        let target = self.resolve(to, to_key)?;
        self.ensure_parent(&target).await?;
        let bytes = fs::copy(&source, &target)
            .await
            .map_err(|e| io_error("copy", from_key, e))?;
        debug!(%from, from_key, %to, to_key, bytes, "Copied object");
        Ok(())
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> AppResult<()> {
        let path = self.resolve(bucket, key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(%bucket, key, "Deleted object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete", key, e)),
        }
    }

    async fn presign_put(
        &self,
        bucket: Bucket,
        key: &str,
        content_type: &str,
        content_length: u64,
        expires_in: Duration,
    ) -> AppResult<PresignedRequest> {
        self.resolve(bucket, key)?;
        let expires_at = expiry(expires_in)?;
        self.presign(
            SignedAccess {
                method: "PUT",
                bucket: self.bucket_name(bucket),
                key,
                expires: expires_at.timestamp(),
                content_type: Some(content_type),
                content_length: Some(content_length),
            },
            expires_at,
        )
    }

    async fn presign_get(
        &self,
        bucket: Bucket,
        key: &str,
        expires_in: Duration,
    ) -> AppResult<PresignedRequest> {
        self.resolve(bucket, key)?;
        let expires_at = expiry(expires_in)?;
        self.presign(
            SignedAccess {
                method: "GET",
                bucket: self.bucket_name(bucket),
                key,
                expires: expires_at.timestamp(),
                content_type: None,
                content_length: None,
            },
            expires_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage(dir: &tempfile::TempDir) -> LocalObjectStorage {
        let mut config = StorageConfig::default();
        config.local.root_path = dir.path().to_string_lossy().to_string();
        config.local.signing_secret = "test-secret".into();
        LocalObjectStorage::new(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_put_copy_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir).await;

        storage
            .put(Bucket::Uploads, "u1/report.pdf", Bytes::from_static(b"%PDF-1.7"))
            .await
            .unwrap();
        assert!(storage.exists(Bucket::Uploads, "u1/report.pdf").await.unwrap());

        storage
            .copy(Bucket::Uploads, "u1/report.pdf", Bucket::Files, "u1/f/report.pdf")
            .await
            .unwrap();
        let copied = storage.get(Bucket::Files, "u1/f/report.pdf").await.unwrap();
        assert_eq!(&copied[..], b"%PDF-1.7");

        storage.delete(Bucket::Uploads, "u1/report.pdf").await.unwrap();
        assert!(!storage.exists(Bucket::Uploads, "u1/report.pdf").await.unwrap());
        // Deleting again is not an error.
        storage.delete(Bucket::Uploads, "u1/report.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_copy_missing_source_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir).await;
        let err = storage
            .copy(Bucket::Uploads, "missing.pdf", Bucket::Files, "x.pdf")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir).await;
        let err = storage
            .put(Bucket::Files, "../escape.pdf", Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_presigned_put_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir).await;
        let presigned = storage
            .presign_put(
                Bucket::Uploads,
                "u1/p1/doc.pdf",
                "application/pdf",
                1024,
                Duration::from_secs(900),
            )
            .await
            .unwrap();

        assert_eq!(presigned.method, "PUT");
        assert!(presigned.url.starts_with("http://localhost:8080/storage/uploads/u1/p1/doc.pdf?"));
        assert_eq!(presigned.headers["Content-Type"], "application/pdf");
        assert_eq!(presigned.headers["Content-Length"], "1024");

        let signature = presigned.url.rsplit("signature=").next().unwrap();
        let mut access = SignedAccess {
            method: "PUT",
            bucket: "uploads",
            key: "u1/p1/doc.pdf",
            expires: presigned.expires_at.timestamp(),
            content_type: Some("application/pdf"),
            content_length: Some(1024),
        };
        assert!(storage.verify(&access, signature, Utc::now()));

        access.content_length = Some(2048);
        assert!(!storage.verify(&access, signature, Utc::now()));

        access.content_length = Some(1024);
        let later = presigned.expires_at + chrono::Duration::seconds(1);
        assert!(!storage.verify(&access, signature, later));
    }
}
