use gallery_core::AssetFormat;
use image::ImageFormat;

use crate::error::{MediaError, MediaResult, OP_RESOLVE_FORMAT};

/// Pick the canonical output format for an incoming image.
///
/// A non-empty `requested` format wins and must be supported and allowed.
/// Otherwise the `detected` format is used when it is allowed, and anything
/// else falls back to PNG. An unusable detected format is never an error.
pub fn resolve_format(
    requested: Option<&str>,
    detected: Option<&str>,
    allowed: &[AssetFormat],
) -> MediaResult<AssetFormat> {
    if let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) {
        return match AssetFormat::parse(requested) {
            Some(format) if allowed.contains(&format) => Ok(format),
            _ => Err(MediaError::UnsupportedFormat {
                operation: OP_RESOLVE_FORMAT,
                format: requested.to_uppercase(),
            }),
        };
    }

    let detected = detected
        .and_then(AssetFormat::parse)
        .filter(|format| allowed.contains(format));

    Ok(detected.unwrap_or(AssetFormat::Png))
}

/// Decoder format name as understood by [`AssetFormat::parse`].
pub fn detected_name(format: ImageFormat) -> String {
    format!("{:?}", format)
}

pub(crate) fn image_format(format: AssetFormat) -> ImageFormat {
    match format {
        AssetFormat::Png => ImageFormat::Png,
        AssetFormat::Jpeg => ImageFormat::Jpeg,
        AssetFormat::Webp => ImageFormat::WebP,
    }
}
