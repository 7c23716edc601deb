//! Upload pipeline: ingest the original, derive its thumbnail, and hand back
//! a descriptor that is only valid once both files are on disk.

use crate::constants::owner_subdirectory;
use crate::state::MediaState;
use gallery_core::{AppError, AssetDescriptor};

pub struct IngestionService;

impl IngestionService {
    /// Store `data` as a new asset for `owner_id`.
    ///
    /// If the thumbnail cannot be produced the freshly written original is
    /// removed again, so a failed call leaves nothing behind.
    #[tracing::instrument(skip(media, data), fields(size_bytes = data.len()))]
    pub async fn store_image(
        media: &MediaState,
        data: Vec<u8>,
        original_name: Option<&str>,
        owner_id: Option<i64>,
        desired_format: Option<&str>,
    ) -> Result<AssetDescriptor, AppError> {
        let subdirectory = owner_subdirectory(owner_id);

        let ingested = media
            .ingestor
            .ingest(data, original_name, subdirectory.as_deref(), desired_format)
            .await?;

        let thumbnail = match media.thumbnails.make_thumbnail(&ingested.absolute_path).await {
            Ok(thumbnail) => thumbnail,
            Err(e) => {
                if let Err(cleanup) = media.images().delete(&ingested.relative_path).await {
                    tracing::warn!(
                        error = %cleanup,
                        relative_path = %ingested.relative_path,
                        "Failed to remove original after thumbnail failure"
                    );
                }
                return Err(e.into());
            }
        };

        Ok(AssetDescriptor {
            relative_path: ingested.relative_path,
            thumbnail_relative_path: Some(thumbnail.relative_path),
            width: ingested.width,
            height: ingested.height,
            format: ingested.format,
        })
    }
}
