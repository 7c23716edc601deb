//! Asset file naming.
//!
//! Originals: `<token>_<stem>.<ext>`, thumbnails: `<stem>_thumb.<ext>`.
//! The token carries 128 bits of randomness, so no existence check is done
//! before writing.

use std::path::Path;

/// Maximum length of a sanitized stem, in characters.
pub const MAX_STEM_LEN: usize = 64;

/// Stem used when sanitization leaves nothing.
pub const DEFAULT_STEM: &str = "image";

const THUMBNAIL_SUFFIX: &str = "_thumb";

/// 16 random bytes, hex encoded.
pub fn random_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let random_bytes: [u8; 16] = rng.random();
    hex::encode(random_bytes)
}

/// Generate the stored file name for an original upload.
///
/// The result is always a single path component: no separators, no `..`,
/// never starting with `-` or `.`.
pub fn generate_asset_filename(original: Option<&str>, extension: &str) -> String {
    let stem = sanitize_stem(original.unwrap_or_default());
    format!("{}_{}.{}", random_token(), stem, extension)
}

/// Reduce a client-supplied filename to a safe stem.
///
/// Only the last path component is used and its final extension is dropped.
/// ASCII alphanumerics, `-`, `_` and `.` are kept, whitespace becomes `_`,
/// and the result is truncated to [`MAX_STEM_LEN`] characters.
pub fn sanitize_stem(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    };

    let cleaned = sanitize_segment(stem);
    if cleaned.is_empty() {
        DEFAULT_STEM.to_string()
    } else {
        cleaned
    }
}

/// Sanitize an optional subdirectory such as an owner or folder name.
///
/// Each `/`-separated segment is cleaned like a stem (without extension
/// stripping); `.`/`..` and segments that end up empty are dropped. Returns
/// `None` when nothing is left.
pub fn sanitize_subdirectory(raw: &str) -> Option<String> {
    let segments: Vec<String> = raw
        .split(['/', '\\'])
        .filter(|s| !matches!(*s, "" | "." | ".."))
        .map(sanitize_segment)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Thumbnail file name for a stored original, keeping its extension.
pub fn thumbnail_file_name(source_file_name: &str) -> String {
    let path = Path::new(source_file_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_STEM);

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}{}.{}", stem, THUMBNAIL_SUFFIX, ext),
        None => format!("{}{}", stem, THUMBNAIL_SUFFIX),
    }
}

fn sanitize_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else if c == '.' {
            if !out.ends_with('.') {
                out.push('.');
            }
        } else if c.is_whitespace() {
            out.push('_');
        }
    }

    let trimmed: String = out
        .trim_start_matches(['.', '-', '_'])
        .chars()
        .take(MAX_STEM_LEN)
        .collect();
    trimmed.trim_end_matches('.').to_string()
}
