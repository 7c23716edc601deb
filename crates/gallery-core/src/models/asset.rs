use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

/// Canonical on-disk encoding of a stored asset.
///
/// `JPG` is accepted as an input spelling of [`AssetFormat::Jpeg`]; the
/// canonical tags are always `PNG`, `JPEG` and `WEBP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetFormat {
    Png,
    Jpeg,
    Webp,
}

impl AssetFormat {
    pub const ALL: [AssetFormat; 3] = [AssetFormat::Png, AssetFormat::Jpeg, AssetFormat::Webp];

    /// Parse a user- or decoder-supplied format name. Returns `None` for
    /// anything outside the supported enumeration.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PNG" => Some(AssetFormat::Png),
            "JPEG" | "JPG" => Some(AssetFormat::Jpeg),
            "WEBP" => Some(AssetFormat::Webp),
            _ => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            AssetFormat::Png => "PNG",
            AssetFormat::Jpeg => "JPEG",
            AssetFormat::Webp => "WEBP",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            AssetFormat::Png => "png",
            AssetFormat::Jpeg => "jpg",
            AssetFormat::Webp => "webp",
        }
    }

    /// Whether the encoding can carry an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, AssetFormat::Jpeg)
    }
}

impl Display for AssetFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_tag())
    }
}

/// Storage-relevant fields of a persisted image.
///
/// Paths are relative to their root and always forward-slash separated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AssetDescriptor {
    pub relative_path: String,
    pub thumbnail_relative_path: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: AssetFormat,
}
