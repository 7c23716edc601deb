//! Gallery Processing Library
//!
//! The image ingestion pipeline: format resolution, decode and re-encode of
//! incoming bytes, thumbnail derivation and remote retrieval. Decoding and
//! encoding are CPU-bound and always run on the blocking pool.

pub mod error;
pub mod format;
pub mod ingest;
pub mod remote;
pub mod thumbnail;

// Re-export commonly used types
pub use error::{MediaError, MediaResult};
pub use format::resolve_format;
pub use ingest::{ImageIngestor, IngestedImage};
pub use remote::{FetchedImage, RemoteFetcher};
pub use thumbnail::{thumbnail_dimensions, Thumbnail, ThumbnailGenerator};
