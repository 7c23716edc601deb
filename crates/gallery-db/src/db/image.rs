use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use gallery_core::models::{GalleryImage, ImageFilter, NewImage, Page, PageRequest};
use gallery_core::AppError;
use tokio::sync::RwLock;

/// Record store for gallery images, keyed by integer id.
#[async_trait::async_trait]
pub trait ImageRepository: Send + Sync {
    async fn create(&self, image: NewImage) -> Result<GalleryImage, AppError>;

    async fn get(&self, id: i64) -> Result<Option<GalleryImage>, AppError>;

    /// Persist every mutable field of `image` and bump `updated_at`.
    async fn update(&self, image: GalleryImage) -> Result<GalleryImage, AppError>;

    /// Remove the record, returning it if it existed.
    async fn delete(&self, id: i64) -> Result<Option<GalleryImage>, AppError>;

    /// Filtered listing, newest first.
    async fn list(
        &self,
        filter: ImageFilter,
        page: PageRequest,
    ) -> Result<Page<GalleryImage>, AppError>;
}

/// Process-local repository. Records live as long as the process.
#[derive(Default)]
pub struct InMemoryImageRepository {
    images: RwLock<BTreeMap<i64, GalleryImage>>,
    next_id: AtomicI64,
}

impl InMemoryImageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(image: &GalleryImage, filter: &ImageFilter) -> bool {
    filter
        .owner_id
        .map_or(true, |owner| image.owner_id == Some(owner))
        && filter
            .folder
            .as_deref()
            .map_or(true, |folder| image.folder == folder)
        && filter
            .format
            .map_or(true, |format| image.descriptor.format == format)
        && filter.q.as_deref().map_or(true, |term| matches_term(image, term))
        && filter
            .tag
            .as_deref()
            .map_or(true, |tag| contains_ignore_case(&image.tags, tag))
        && (!filter.public_only || image.is_public)
}

fn matches_term(image: &GalleryImage, term: &str) -> bool {
    if contains_ignore_case(&image.title, term) || contains_ignore_case(&image.tags, term) {
        return true;
    }
    term.bytes().all(|b| b.is_ascii_digit()) && term.parse::<i64>().map_or(false, |id| id == image.id)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait::async_trait]
impl ImageRepository for InMemoryImageRepository {
    #[tracing::instrument(skip(self, image), fields(db.table = "images", db.operation = "insert"))]
    async fn create(&self, image: NewImage) -> Result<GalleryImage, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();

        let record = GalleryImage {
            id,
            owner_id: image.owner_id,
            title: image.title,
            description: image.description,
            folder: image.folder,
            tags: image.tags,
            is_public: image.is_public,
            source_url: image.source_url,
            descriptor: image.descriptor,
            created_at: now,
            updated_at: now,
        };

        self.images.write().await.insert(id, record.clone());
        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: i64) -> Result<Option<GalleryImage>, AppError> {
        Ok(self.images.read().await.get(&id).cloned())
    }

    #[tracing::instrument(skip(self, image), fields(db.table = "images", db.operation = "update", db.record_id = %image.id))]
    async fn update(&self, mut image: GalleryImage) -> Result<GalleryImage, AppError> {
        let mut images = self.images.write().await;
        let existing = images
            .get_mut(&image.id)
            .ok_or_else(|| AppError::NotFound(format!("Image {} not found", image.id)))?;

        image.created_at = existing.created_at;
        image.updated_at = Utc::now();
        *existing = image.clone();

        Ok(image)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: i64) -> Result<Option<GalleryImage>, AppError> {
        Ok(self.images.write().await.remove(&id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    async fn list(
        &self,
        filter: ImageFilter,
        page: PageRequest,
    ) -> Result<Page<GalleryImage>, AppError> {
        let images = self.images.read().await;

        let mut matching: Vec<&GalleryImage> = images
            .values()
            .filter(|image| matches_filter(image, &filter))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(page.offset())
            .take(page.per_page as usize)
            .cloned()
            .collect();

        Ok(Page::new(items, total, page))
    }
}
