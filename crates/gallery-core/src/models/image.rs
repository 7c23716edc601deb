use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::asset::{AssetDescriptor, AssetFormat};

/// Public URL prefix for stored originals.
pub const IMAGE_URL_PREFIX: &str = "/media/images";
/// Public URL prefix for thumbnails.
pub const THUMBNAIL_URL_PREFIX: &str = "/media/thumbnails";

/// A gallery entry: an ingested asset plus its user-facing metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: i64,
    pub owner_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub folder: String,
    pub tags: String,
    pub is_public: bool,
    pub source_url: Option<String>,
    pub descriptor: AssetDescriptor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GalleryImage {
    pub fn is_owned_by(&self, user_id: Option<i64>) -> bool {
        matches!((self.owner_id, user_id), (Some(owner), Some(caller)) if owner == caller)
    }

    /// Anonymous uploads have no owner and may be managed by anyone.
    pub fn can_be_modified_by(&self, user_id: Option<i64>) -> bool {
        self.owner_id.is_none() || self.is_owned_by(user_id)
    }

    pub fn is_visible_to(&self, user_id: Option<i64>) -> bool {
        self.is_public || self.is_owned_by(user_id)
    }
}

/// Fields required to create a [`GalleryImage`]; ids and timestamps are
/// assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub owner_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub folder: String,
    pub tags: String,
    pub is_public: bool,
    pub source_url: Option<String>,
    pub descriptor: AssetDescriptor,
}

/// Listing filter. `None` fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct ImageFilter {
    pub owner_id: Option<i64>,
    pub folder: Option<String>,
    pub format: Option<AssetFormat>,
    /// Case-insensitive match against title or tags; an all-digit term also
    /// matches the image id.
    pub q: Option<String>,
    /// Case-insensitive substring of the tags string.
    pub tag: Option<String>,
    pub public_only: bool,
}

/// Image information in responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageResponse {
    pub id: i64,
    pub owner_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub folder: String,
    pub tags: String,
    pub is_public: bool,
    pub source_url: Option<String>,
    pub filename: String,
    pub thumbnail: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: AssetFormat,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub download_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GalleryImage> for ImageResponse {
    fn from(image: GalleryImage) -> Self {
        let descriptor = image.descriptor;
        Self {
            id: image.id,
            owner_id: image.owner_id,
            title: image.title,
            description: image.description,
            folder: image.folder,
            tags: image.tags,
            is_public: image.is_public,
            source_url: image.source_url,
            image_url: format!("{}/{}", IMAGE_URL_PREFIX, descriptor.relative_path),
            download_url: format!("/media/download/{}", descriptor.relative_path),
            thumbnail_url: descriptor
                .thumbnail_relative_path
                .as_ref()
                .map(|p| format!("{}/{}", THUMBNAIL_URL_PREFIX, p)),
            filename: descriptor.relative_path,
            thumbnail: descriptor.thumbnail_relative_path,
            width: descriptor.width,
            height: descriptor.height,
            format: descriptor.format,
            created_at: image.created_at,
            updated_at: image.updated_at,
        }
    }
}
