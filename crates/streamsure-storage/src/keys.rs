//! Shared key generation for storage backends.

use uuid::Uuid;

/// Build a new storage key for a blob belonging to `asset_id`.
///
/// Each call yields a distinct key so a replacement never overwrites the blob
/// it replaces.
pub fn generate_storage_key(asset_id: Uuid, filename: &str) -> String {
    let blob_id = Uuid::new_v4();
    match extension(filename) {
        Some(ext) => format!("media/{}/{}.{}", asset_id, blob_id, ext),
        None => format!("media/{}/{}", asset_id, blob_id),
    }
}

fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_keeps_sanitized_extension() {
        let asset_id = Uuid::new_v4();
        let key = generate_storage_key(asset_id, "Holiday.MP4");
        assert!(key.starts_with(&format!("media/{}/", asset_id)));
        assert!(key.ends_with(".mp4"));
    }

    #[test]
    fn test_key_drops_suspicious_extension() {
        let key = generate_storage_key(Uuid::new_v4(), "clip./../../etc");
        assert!(!key.contains(".."));
        let key = generate_storage_key(Uuid::new_v4(), "no_extension");
        assert!(!key.contains('.'));
    }

    #[test]
    fn test_keys_are_unique_per_call() {
        let asset_id = Uuid::new_v4();
        assert_ne!(
            generate_storage_key(asset_id, "a.mp4"),
            generate_storage_key(asset_id, "a.mp4")
        );
    }
}
