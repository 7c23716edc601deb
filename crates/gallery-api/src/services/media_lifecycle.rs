//! Media lifecycle operations: removal of stored originals and thumbnails.
//!
//! Keeps handler logic thin and allows unit testing without HTTP.

use crate::state::MediaState;
use gallery_core::AssetDescriptor;

/// Service for media lifecycle operations (deleting files behind a record).
pub struct MediaLifecycleService;

impl MediaLifecycleService {
    /// Delete the original and thumbnail described by `descriptor`.
    /// Best-effort: logs failures but never fails the surrounding operation.
    pub async fn delete_asset_files(media: &MediaState, descriptor: &AssetDescriptor) {
        if let Err(e) = media.images().delete(&descriptor.relative_path).await {
            tracing::warn!(
                error = %e,
                relative_path = %descriptor.relative_path,
                "Failed to delete original image"
            );
        }

        if let Some(thumbnail) = &descriptor.thumbnail_relative_path {
            if let Err(e) = media.thumbnail_storage().delete(thumbnail).await {
                tracing::warn!(
                    error = %e,
                    relative_path = %thumbnail,
                    "Failed to delete thumbnail"
                );
            }
        }
    }
}
