use async_trait::async_trait;
use streamsure_core::models::Asset;

use crate::analyzer::{AnalysisError, AssetMetadata, MetadataExtractor};

/// Nominal bitrate used to estimate playback duration (2 Mbit/s).
const NOMINAL_BYTES_PER_SEC: f64 = 250_000.0;

/// Estimates duration from the stored size instead of probing the container.
#[derive(Debug, Clone, Default)]
pub struct SizeBasedMetadataExtractor;

#[async_trait]
impl MetadataExtractor for SizeBasedMetadataExtractor {
    async fn extract(&self, asset: &Asset) -> Result<AssetMetadata, AnalysisError> {
        if asset.size() == 0 {
            return Err(AnalysisError::ContentUnavailable(
                "asset has no content".to_string(),
            ));
        }
        let seconds = asset.size() as f64 / NOMINAL_BYTES_PER_SEC;
        Ok(AssetMetadata {
            duration_secs: Some((seconds * 100.0).round() / 100.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamsure_core::models::{BlobRef, NewAsset, Visibility};
    use uuid::Uuid;

    fn asset_of_size(size: u64) -> Asset {
        Asset::new(NewAsset {
            owner_id: Uuid::new_v4(),
            title: "t".to_string(),
            description: String::new(),
            blob: BlobRef {
                key: "k".to_string(),
                size,
            },
            content_type: "video/mp4".to_string(),
            visibility: Visibility::default(),
        })
    }

    #[tokio::test]
    async fn test_duration_estimated_from_size() {
        let meta = SizeBasedMetadataExtractor
            .extract(&asset_of_size(500_000))
            .await
            .unwrap();
        assert_eq!(meta.duration_secs, Some(2.0));
    }

    #[tokio::test]
    async fn test_empty_asset_fails() {
        assert!(SizeBasedMetadataExtractor
            .extract(&asset_of_size(0))
            .await
            .is_err());
    }
}
