#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{Storage, StorageResult};
use std::sync::Arc;
use streamsure_core::Config;

/// Create the blob storage backend from configuration
#[cfg(feature = "storage-local")]
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(&config.local_storage_path).await?;
    tracing::info!(path = %config.local_storage_path, "Using local filesystem storage");
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "storage-local"))]
pub async fn create_storage(_config: &Config) -> StorageResult<Arc<dyn Storage>> {
    Err(crate::StorageError::ConfigError(
        "No storage backend available (storage-local feature not enabled)".to_string(),
    ))
}
