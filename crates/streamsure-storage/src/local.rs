use crate::keys::generate_storage_key;
use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use streamsure_core::models::BlobRef;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use uuid::Uuid;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at `base_path` (e.g. "./data/media").
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Convert storage key to filesystem path, rejecting keys that escape the
    /// base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn open_existing(&self, storage_key: &str) -> StorageResult<(PathBuf, fs::File)> {
        let path = self.key_to_path(storage_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        Ok((path, file))
    }
}

fn chunk_stream<R>(reader: R, storage_key: &str) -> ByteStream
where
    R: tokio::io::AsyncRead + Send + 'static,
{
    let key = storage_key.to_string();
    let stream = tokio_util::io::ReaderStream::new(reader).map(move |result| {
        result.map_err(|e| {
            tracing::error!(key = %key, error = %e, "Local storage stream read error");
            StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
        })
    });
    Box::pin(stream)
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(
        &self,
        asset_id: Uuid,
        filename: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<BlobRef> {
        let key = generate_storage_key(asset_id, filename);
        let path = self.key_to_path(&key)?;
        let size = data.len() as u64;

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(BlobRef { key, size })
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let (_, file) = self.open_existing(storage_key).await?;
        Ok(chunk_stream(file, storage_key))
    }

    async fn download_range(
        &self,
        storage_key: &str,
        start: u64,
        end: u64,
    ) -> StorageResult<ByteStream> {
        let (path, mut file) = self.open_existing(storage_key).await?;

        let size = file
            .metadata()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .len();

        if start > end || end >= size {
            return Err(StorageError::InvalidRange { start, end, size });
        }

        file.seek(SeekFrom::Start(start)).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to seek in {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            key = %storage_key,
            range_start = start,
            range_end = end,
            size_bytes = size,
            "Local storage range download"
        );

        Ok(chunk_stream(file.take(end - start + 1), storage_key))
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        let path = self.key_to_path(storage_key)?;
        let meta = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(storage_key.to_string())
            } else {
                StorageError::BackendError(e.to_string())
            }
        })?;
        Ok(meta.len())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        // Drop the per-asset directory once it is empty; failure here is harmless.
        if let Some(parent) = path.parent() {
            if parent != self.base_path {
                let _ = fs::remove_dir(parent).await;
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }
}
