//! Gallery Storage Library
//!
//! Filesystem storage for gallery assets. A [`LocalStorage`] is rooted at one
//! directory and every relative path it is handed is resolved against that
//! root; any path that would land outside it is rejected as `Forbidden`.
//!
//! # Asset naming
//!
//! Stored originals are named `<token>_<stem>.<ext>` where `<token>` is 128
//! random bits in hex and `<stem>` is the sanitized original filename (at most
//! 64 characters, `image` when nothing survives sanitization). Thumbnails use
//! `<stem>_thumb.<ext>` of the original's file name. Naming lives in the
//! [`keys`] module so every writer stays consistent.

pub mod error;
pub mod keys;
pub mod local;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use keys::{generate_asset_filename, sanitize_stem, sanitize_subdirectory, thumbnail_file_name};
pub use local::{LocalStorage, StoredFile};
