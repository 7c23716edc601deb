//! Image ingestion: decode, normalize, re-encode and store.

use std::io::Cursor;
use std::path::PathBuf;

use gallery_core::AssetFormat;
use gallery_storage::{generate_asset_filename, sanitize_subdirectory, LocalStorage};
use image::{DynamicImage, GenericImageView, ImageReader};

use crate::error::{MediaError, MediaResult, OP_INGEST};
use crate::format::{detected_name, image_format, resolve_format};

/// Result of a successful ingestion. The file is already durably written.
#[derive(Debug, Clone)]
pub struct IngestedImage {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format: AssetFormat,
}

struct EncodedImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: AssetFormat,
}

/// Turns arbitrary incoming bytes into a stored, canonically encoded asset.
#[derive(Clone)]
pub struct ImageIngestor {
    storage: LocalStorage,
    allowed_formats: Vec<AssetFormat>,
}

impl ImageIngestor {
    pub fn new(storage: LocalStorage, allowed_formats: Vec<AssetFormat>) -> Self {
        Self {
            storage,
            allowed_formats,
        }
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Decode `data`, re-encode it in the resolved format and write it under
    /// the storage root (inside `subdirectory` when given).
    ///
    /// Nothing is written unless decoding, format resolution and encoding all
    /// succeed.
    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn ingest(
        &self,
        data: Vec<u8>,
        original_name: Option<&str>,
        subdirectory: Option<&str>,
        desired_format: Option<&str>,
    ) -> MediaResult<IngestedImage> {
        let desired = desired_format.map(str::to_string);
        let allowed = self.allowed_formats.clone();

        let encoded = tokio::task::spawn_blocking(move || {
            decode_and_encode(&data, desired.as_deref(), &allowed)
        })
        .await
        .map_err(|e| MediaError::TaskFailed {
            operation: OP_INGEST,
            reason: e.to_string(),
        })??;

        let file_name = generate_asset_filename(original_name, encoded.format.extension());
        let relative_path = match subdirectory.and_then(sanitize_subdirectory) {
            Some(dir) => format!("{}/{}", dir, file_name),
            None => file_name,
        };

        let absolute_path = self
            .storage
            .write(&relative_path, &encoded.data)
            .await
            .map_err(|e| MediaError::write_failed(OP_INGEST, e))?;

        tracing::info!(
            relative_path = %relative_path,
            width = encoded.width,
            height = encoded.height,
            format = %encoded.format,
            "Image ingested"
        );

        Ok(IngestedImage {
            relative_path,
            absolute_path,
            width: encoded.width,
            height: encoded.height,
            format: encoded.format,
        })
    }
}

fn decode_and_encode(
    data: &[u8],
    desired_format: Option<&str>,
    allowed: &[AssetFormat],
) -> MediaResult<EncodedImage> {
    if data.is_empty() {
        return Err(MediaError::invalid_image(OP_INGEST, "empty payload"));
    }

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| MediaError::invalid_image(OP_INGEST, e))?;
    let detected = reader.format().map(detected_name);
    let img = reader
        .decode()
        .map_err(|e| MediaError::invalid_image(OP_INGEST, e))?;

    let format = resolve_format(desired_format, detected.as_deref(), allowed)?;
    let (width, height) = img.dimensions();

    // JPEG has no alpha channel; everything else keeps RGBA.
    let normalized = if format.supports_alpha() {
        DynamicImage::ImageRgba8(img.into_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.into_rgb8())
    };

    let data = encode(&normalized, format)
        .map_err(|e| MediaError::invalid_image(OP_INGEST, format!("encode failed: {}", e)))?;

    Ok(EncodedImage {
        data,
        width,
        height,
        format,
    })
}

pub(crate) fn encode(img: &DynamicImage, format: AssetFormat) -> image::ImageResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image_format(format))?;
    Ok(buffer.into_inner())
}
