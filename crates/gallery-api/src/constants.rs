//! Application constants

/// API version prefix for all versioned endpoints.
pub const API_PREFIX: &str = "/api/v0";

/// Title given to uploads that do not provide one.
pub const DEFAULT_UPLOAD_TITLE: &str = "Untitled";

/// Title given to URL imports that do not provide one.
pub const DEFAULT_IMPORT_TITLE: &str = "Imported";

/// Per-owner subdirectory of the image root. Anonymous uploads are stored
/// at the top level.
pub fn owner_subdirectory(owner_id: Option<i64>) -> Option<String> {
    owner_id.map(|id| format!("user_{}", id))
}
