//! StreamSure Storage Library
//!
//! Blob storage abstraction for uploaded media and its local filesystem
//! implementation.
//!
//! # Storage key format
//!
//! Every stored blob gets its own key: `media/{asset_id}/{blob_id}.{ext}`.
//! Content replacement therefore writes a new key and the previous blob can be
//! removed independently. Keys must not contain `..` or a leading `/`.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};

use streamsure_core::AppError;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => {
                tracing::error!(key = %key, "Blob missing for existing asset record");
                AppError::Storage(format!("Blob not found: {}", key))
            }
            other => AppError::Storage(other.to_string()),
        }
    }
}
