//! In-memory storage provider.
//!
//! Used by tests and by the `memory` provider setting. Copy and delete can
//! be made to fail on demand so callers' failure paths can be exercised.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_core::traits::{Bucket, ObjectStorage, PresignedRequest};

/// In-memory object storage.
#[derive(Debug, Default)]
pub struct MemoryObjectStorage {
    objects: RwLock<HashMap<(Bucket, String), Bytes>>,
    delete_log: RwLock<Vec<(Bucket, String)>>,
    fail_copy: AtomicBool,
    fail_delete: AtomicBool,
}

impl MemoryObjectStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent copy fail with a storage error.
    pub fn set_fail_copy(&self, fail: bool) {
        self.fail_copy.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent delete fail with a storage error.
    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Every delete that was attempted, in order, including failed ones.
    pub fn delete_attempts(&self) -> Vec<(Bucket, String)> {
        self.delete_log
            .read()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Number of stored objects in a bucket.
    pub fn object_count(&self, bucket: Bucket) -> usize {
        self.objects
            .read()
            .map(|objects| objects.keys().filter(|(b, _)| *b == bucket).count())
            .unwrap_or_default()
    }

    fn presigned(&self, method: &str, bucket: Bucket, key: &str, expires_in: Duration) -> AppResult<PresignedRequest> {
        let delta = chrono::Duration::from_std(expires_in)
            .map_err(|e| AppError::validation(format!("Invalid presign expiry: {e}")))?;
        let expires_at = Utc::now() + delta;
        Ok(PresignedRequest {
            url: format!("memory://{bucket}/{key}?expires={}", expires_at.timestamp()),
            method: method.to_string(),
            expires_at,
            headers: BTreeMap::new(),
        })
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::internal("Memory storage lock poisoned")
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn put(&self, bucket: Bucket, key: &str, data: Bytes) -> AppResult<()> {
        self.objects
            .write()
            .map_err(poisoned)?
            .insert((bucket, key.to_string()), data);
        Ok(())
    }

    async fn get(&self, bucket: Bucket, key: &str) -> AppResult<Bytes> {
        self.objects
            .read()
            .map_err(poisoned)?
            .get(&(bucket, key.to_string()))
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Object not found: {key}")))
    }

    async fn exists(&self, bucket: Bucket, key: &str) -> AppResult<bool> {
        Ok(self
            .objects
            .read()
            .map_err(poisoned)?
            .contains_key(&(bucket, key.to_string())))
    }

    async fn copy(
        &self,
        from: Bucket,
        from_key: &str,
        to: Bucket,
        to_key: &str,
    ) -> AppResult<()> {
        if self.fail_copy.load(Ordering::SeqCst) {
            return Err(AppError::storage(format!("Copy of {from_key} failed")));
        }
        let mut objects = self.objects.write().map_err(poisoned)?;
        let data = objects
            .get(&(from, from_key.to_string()))
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Object not found: {from_key}")))?;
        objects.insert((to, to_key.to_string()), data);
        Ok(())
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> AppResult<()> {
        self.delete_log
            .write()
            .map_err(poisoned)?
            .push((bucket, key.to_string()));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::storage(format!("Delete of {key} failed")));
        }
        self.objects
            .write()
            .map_err(poisoned)?
            .remove(&(bucket, key.to_string()));
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
        let mut request = self.presigned("PUT", bucket, key, expires_in)?;
        request
            .headers
            .insert("Content-Type".to_string(), content_type.to_string());
        request
            .headers
            .insert("Content-Length".to_string(), content_length.to_string());
        Ok(request)
    }

    async fn presign_get(
        &self,
        bucket: Bucket,
        key: &str,
        expires_in: Duration,
    ) -> AppResult<PresignedRequest> {
        self.presigned("GET", bucket, key, expires_in)
    }
}
