//! Range-addressable delivery of asset bytes.

use streamsure_core::access::Operation;
use streamsure_core::models::Subject;
use streamsure_core::{AppError, ByteRange};
use streamsure_storage::ByteStream;
use uuid::Uuid;

use super::assets::AssetService;

/// Bytes ready to be written to the client.
pub struct Delivery {
    pub content_type: String,
    pub size: u64,
    /// `Some` for a partial response
    pub range: Option<ByteRange>,
    pub body: ByteStream,
}

impl Delivery {
    pub fn content_length(&self) -> u64 {
        self.range.map(|r| r.len()).unwrap_or(self.size)
    }
}

#[derive(Clone)]
pub struct DeliveryService {
    assets: AssetService,
}

impl DeliveryService {
    pub fn new(assets: AssetService) -> Self {
        Self { assets }
    }

    /// Open the asset for streaming, honoring an optional `Range` header value.
    ///
    /// The range is validated against the recorded size before storage is touched.
    #[tracing::instrument(skip(self, range_header), fields(subject_id = %subject.id, asset_id = %id))]
    pub async fn open(
        &self,
        subject: &Subject,
        id: Uuid,
        range_header: Option<&str>,
    ) -> Result<Delivery, AppError> {
        let asset = self
            .assets
            .authorized(subject, id, Operation::Stream)
            .await?;
        let size = asset.size();
        let storage = self.assets.storage();

        let range = range_header
            .map(|header| ByteRange::parse(header, size))
            .transpose()?;

        let body = match range {
            Some(range) => {
                tracing::debug!(start = range.start, end = range.end, size, "Serving partial content");
                storage
                    .download_range(asset.storage_key(), range.start, range.end)
                    .await?
            }
            None => storage.download_stream(asset.storage_key()).await?,
        };

        Ok(Delivery {
            content_type: asset.content_type,
            size,
            range,
            body,
        })
    }
}
