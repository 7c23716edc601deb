use std::io::Cursor;
use std::path::{Path, PathBuf};

use gallery_storage::{thumbnail_file_name, LocalStorage};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

use crate::error::{MediaError, MediaResult, OP_MAKE_THUMBNAIL};

/// A derived preview written to the thumbnail root.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Scale `(width, height)` so the larger side equals `max_dimension`,
/// keeping the aspect ratio. Images that already fit are left as is.
/// A zero bound is treated as 1.
pub fn thumbnail_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    if width == 0 || height == 0 || (width <= max_dimension && height <= max_dimension) {
        return (width, height);
    }

    let scale = |side: u32, longest: u32| -> u32 {
        let scaled = (side as f64 * max_dimension as f64 / longest as f64).round() as u32;
        scaled.clamp(1, max_dimension)
    };

    if width >= height {
        (max_dimension, scale(height, width))
    } else {
        (scale(width, height), max_dimension)
    }
}

/// Writes bounded-size previews of stored originals.
#[derive(Clone)]
pub struct ThumbnailGenerator {
    storage: LocalStorage,
    max_dimension: u32,
}

impl ThumbnailGenerator {
    pub fn new(storage: LocalStorage, max_dimension: u32) -> Self {
        Self {
            storage,
            max_dimension: max_dimension.max(1),
        }
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Derive a thumbnail from the original at `source`.
    ///
    /// The thumbnail is encoded like the source and named
    /// `<source stem>_thumb.<source ext>` directly under the thumbnail root.
    #[tracing::instrument(skip(self), fields(source = %source.display(), max_dimension = self.max_dimension))]
    pub async fn make_thumbnail(&self, source: &Path) -> MediaResult<Thumbnail> {
        let data = tokio::fs::read(source).await.map_err(|e| {
            MediaError::invalid_image(
                OP_MAKE_THUMBNAIL,
                format!("cannot read {}: {}", source.display(), e),
            )
        })?;

        let source_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MediaError::invalid_image(OP_MAKE_THUMBNAIL, "source has no file name"))?;
        let relative_path = thumbnail_file_name(source_name);

        let fallback_format = ImageFormat::from_path(source).ok();
        let max_dimension = self.max_dimension;
        let (encoded, width, height) = tokio::task::spawn_blocking(move || {
            render_thumbnail(&data, fallback_format, max_dimension)
        })
        .await
        .map_err(|e| MediaError::TaskFailed {
            operation: OP_MAKE_THUMBNAIL,
            reason: e.to_string(),
        })??;

        let absolute_path = self
            .storage
            .write(&relative_path, &encoded)
            .await
            .map_err(|e| MediaError::write_failed(OP_MAKE_THUMBNAIL, e))?;

        tracing::info!(
            relative_path = %relative_path,
            width = width,
            height = height,
            "Thumbnail generated"
        );

        Ok(Thumbnail {
            relative_path,
            absolute_path,
            width,
            height,
        })
    }
}

fn render_thumbnail(
    data: &[u8],
    fallback_format: Option<ImageFormat>,
    max_dimension: u32,
) -> MediaResult<(Vec<u8>, u32, u32)> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| MediaError::invalid_image(OP_MAKE_THUMBNAIL, e))?;
    let format = reader
        .format()
        .or(fallback_format)
        .ok_or_else(|| MediaError::invalid_image(OP_MAKE_THUMBNAIL, "unknown source format"))?;
    let img = reader
        .decode()
        .map_err(|e| MediaError::invalid_image(OP_MAKE_THUMBNAIL, e))?;

    let (orig_width, orig_height) = img.dimensions();
    let (width, height) = thumbnail_dimensions(orig_width, orig_height, max_dimension);

    let resized = if (width, height) == (orig_width, orig_height) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Lanczos3)
    };

    let normalized = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.into_rgb8()),
        _ => DynamicImage::ImageRgba8(resized.into_rgba8()),
    };

    let mut buffer = Cursor::new(Vec::new());
    normalized
        .write_to(&mut buffer, format)
        .map_err(|e| MediaError::invalid_image(OP_MAKE_THUMBNAIL, format!("encode failed: {}", e)))?;

    Ok((buffer.into_inner(), width, height))
}
