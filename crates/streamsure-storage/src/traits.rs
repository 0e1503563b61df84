//! Storage abstraction trait
//!
//! Every blob backend implements [`Storage`]. The asset services only ever
//! talk to `Arc<dyn Storage>`.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use streamsure_core::models::BlobRef;
use thiserror::Error;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid byte range {start}-{end} for {size} byte object")]
    InvalidRange { start: u64, end: u64, size: u64 },

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked blob contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// **Key format:** `media/{asset_id}/{blob_id}.{ext}`. See the crate root
/// documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store the bytes of an asset under a freshly generated key.
    ///
    /// `filename` only contributes its extension to the key.
    async fn upload(
        &self,
        asset_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<BlobRef>;

    /// Download a whole blob into memory
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Download a whole blob as a stream of chunks
    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;

    /// Stream the inclusive byte range `start..=end` of a blob.
    ///
    /// `end` must lie inside the object; callers clamp it first.
    async fn download_range(
        &self,
        storage_key: &str,
        start: u64,
        end: u64,
    ) -> StorageResult<ByteStream>;

    /// Size in bytes of an object
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Check if a blob exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Delete a blob. Deleting a missing blob succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;
}
