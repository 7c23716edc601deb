//! Storage roots, media pipeline, repository and token verifier.

use crate::auth::JwtVerifier;
use crate::state::{AppState, MediaState};
use anyhow::{Context, Result};
use gallery_core::Config;
use gallery_db::InMemoryImageRepository;
use gallery_processing::{ImageIngestor, RemoteFetcher, ThumbnailGenerator};
use gallery_storage::LocalStorage;
use std::sync::Arc;

pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let media = &config.media;

    let image_storage = LocalStorage::new(&media.image_dir)
        .await
        .with_context(|| format!("Failed to prepare image directory {}", media.image_dir.display()))?;
    let thumbnail_storage = LocalStorage::new(&media.thumbnail_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to prepare thumbnail directory {}",
                media.thumbnail_dir.display()
            )
        })?;

    let fetcher = RemoteFetcher::new(config.remote.timeout)
        .context("Failed to build remote fetch client")?;

    let media_state = MediaState {
        ingestor: ImageIngestor::new(image_storage, media.allowed_formats.clone()),
        thumbnails: ThumbnailGenerator::new(thumbnail_storage, media.thumbnail_size),
        fetcher,
    };

    tracing::info!(
        thumbnail_size = media.thumbnail_size,
        max_upload_mb = media.max_upload_bytes / 1024 / 1024,
        allowed_formats = ?media.allowed_formats,
        "Media pipeline initialized"
    );

    Ok(Arc::new(AppState {
        config: Arc::new(config.clone()),
        images: Arc::new(InMemoryImageRepository::new()),
        media: media_state,
        auth: Arc::new(JwtVerifier::new(&config.jwt_secret)),
    }))
}
