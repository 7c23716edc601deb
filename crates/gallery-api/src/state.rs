//! Application state shared by every handler.

use crate::auth::TokenVerifier;
use gallery_core::Config;
use gallery_db::ImageRepository;
use gallery_processing::{ImageIngestor, RemoteFetcher, ThumbnailGenerator};
use gallery_storage::LocalStorage;
use std::sync::Arc;

/// Media pipeline components, each bound to its storage root.
#[derive(Clone)]
pub struct MediaState {
    pub ingestor: ImageIngestor,
    pub thumbnails: ThumbnailGenerator,
    pub fetcher: RemoteFetcher,
}

impl MediaState {
    /// Root holding originals.
    pub fn images(&self) -> &LocalStorage {
        self.ingestor.storage()
    }

    /// Root holding thumbnails.
    pub fn thumbnail_storage(&self) -> &LocalStorage {
        self.thumbnails.storage()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub images: Arc<dyn ImageRepository>,
    pub media: MediaState,
    pub auth: Arc<dyn TokenVerifier>,
}
