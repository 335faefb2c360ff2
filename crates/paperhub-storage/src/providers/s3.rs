//! S3-compatible storage provider (AWS S3, MinIO).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info};

use paperhub_core::config::storage::StorageConfig;
use paperhub_core::error::{AppError, ErrorKind};
use paperhub_core::result::AppResult;
use paperhub_core::traits::{Bucket, ObjectStorage, PresignedRequest};

/// S3 storage provider.
#[derive(Debug, Clone)]
pub struct S3ObjectStorage {
    client: Client,
    uploads_bucket: String,
    files_bucket: String,
}

impl S3ObjectStorage {
    /// Build a client from the `[storage.s3]` section.
    pub async fn new(config: &StorageConfig) -> AppResult<Self> {
        let s3 = &config.s3;
        info!(
            endpoint = %s3.endpoint,
            region = %s3.region,
            uploads = %config.uploads_bucket,
            files = %config.files_bucket,
            "Initializing S3 storage"
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(s3.region.clone()));
        if !s3.access_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                s3.access_key.clone(),
                s3.secret_key.clone(),
                None,
                None,
                "paperhub",
            ));
        }
        let shared = loader.load().await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared).force_path_style(s3.force_path_style);
        if !s3.endpoint.is_empty() {
            builder = builder.endpoint_url(&s3.endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            uploads_bucket: config.uploads_bucket.clone(),
            files_bucket: config.files_bucket.clone(),
        })
    }

    fn bucket_name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Uploads => &self.uploads_bucket,
            Bucket::Files => &self.files_bucket,
        }
    }

    fn presigning(expires_in: Duration) -> AppResult<PresigningConfig> {
        PresigningConfig::expires_in(expires_in)
            .map_err(|e| AppError::validation(format!("Invalid presign expiry: {e}")))
    }
}

fn s3_error(message: String, e: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::with_source(ErrorKind::StorageUnavailable, message, e)
}

fn presigned(
    request: aws_sdk_s3::presigning::PresignedRequest,
    expires_in: Duration,
) -> AppResult<PresignedRequest> {
    let delta = chrono::Duration::from_std(expires_in)
        .map_err(|e| AppError::validation(format!("Invalid presign expiry: {e}")))?;
    let headers: BTreeMap<String, String> = request
        .headers()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    Ok(PresignedRequest {
        url: request.uri().to_string(),
        method: request.method().to_string(),
        expires_at: Utc::now() + delta,
        headers,
    })
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self
            .client
            .head_bucket()
            .bucket(&self.files_bucket)
            .send()
            .await
            .is_ok())
    }

    async fn put(&self, bucket: Bucket, key: &str, data: Bytes) -> AppResult<()> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| s3_error(format!("Failed to put object: {key}"), e))?;
        debug!(%bucket, key, bytes = len, "Put object");
        Ok(())
    }

    async fn get(&self, bucket: Bucket, key: &str) -> AppResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    AppError::not_found(format!("Object not found: {key}"))
                } else {
                    s3_error(format!("Failed to get object: {key}"), e)
                }
            })?;
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| s3_error(format!("Failed to read object body: {key}"), e))?;
        Ok(data.into_bytes())
    }

    async fn exists(&self, bucket: Bucket, key: &str) -> AppResult<bool> {
        match self
            .client
            .head_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(s3_error(format!("Failed to stat object: {key}"), e)),
        }
    }

    async fn copy(
        &self,
        from: Bucket,
        from_key: &str,
        to: Bucket,
        to_key: &str,
    ) -> AppResult<()> {
        let source = format!("{}/{}", self.bucket_name(from), from_key);
        self.client
            .copy_object()
            .copy_source(&source)
            .bucket(self.bucket_name(to))
            .key(to_key)
            .send()
            .await
            .map_err(|e| s3_error(format!("Failed to copy object: {source}"), e))?;
        debug!(%from, from_key, %to, to_key, "Copied object");
        Ok(())
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .send()
            .await
            .map_err(|e| s3_error(format!("Failed to delete object: {key}"), e))?;
        Ok(())
    }

    async fn presign_put(
        &self,
        bucket: Bucket,
        key: &str,
        content_type: &str,
        content_length: u64,
        expires_in: Duration,
    ) -> AppResult<PresignedRequest> {
        let length = i64::try_from(content_length)
            .map_err(|_| AppError::invalid_field("file_size", "File size is too large"))?;
        let request = self
            .client
            .put_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .content_type(content_type)
            .content_length(length)
            .presigned(Self::presigning(expires_in)?)
            .await
            .map_err(|e| s3_error(format!("Failed to presign upload: {key}"), e))?;
        presigned(request, expires_in)
    }

    async fn presign_get(
        &self,
        bucket: Bucket,
        key: &str,
        expires_in: Duration,
    ) -> AppResult<PresignedRequest> {
        let request = self
            .client
            .get_object()
            .bucket(self.bucket_name(bucket))
            .key(key)
            .presigned(Self::presigning(expires_in)?)
            .await
            .map_err(|e| s3_error(format!("Failed to presign download: {key}"), e))?;
        presigned(request, expires_in)
    }
}
