//! Build the configured storage gateway.

use std::sync::Arc;

use tracing::info;

use paperhub_core::config::storage::StorageConfig;
use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_core::traits::ObjectStorage;

use crate::providers::local::LocalObjectStorage;
use crate::providers::memory::MemoryObjectStorage;

/// Instantiate the gateway named by `config.provider`.
pub async fn connect(config: &StorageConfig) -> AppResult<Arc<dyn ObjectStorage>> {
    info!(provider = %config.provider, "Initializing object storage");

    match config.provider.as_str() {
        "local" => Ok(Arc::new(LocalObjectStorage::new(config).await?)),
        "memory" => Ok(Arc::new(MemoryObjectStorage::new())),
        #[cfg(feature = "s3")]
        "s3" => Ok(Arc::new(
            crate::providers::s3::S3ObjectStorage::new(config).await?,
        )),
        other => Err(AppError::configuration(format!(
            "Unsupported storage provider '{other}'"
        ))),
    }
}
