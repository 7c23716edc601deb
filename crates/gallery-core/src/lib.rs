//! Gallery Core Library
//!
//! This crate provides the domain models, error types and configuration
//! shared by every gallery component.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, LogFormat, MediaConfig, RemoteFetchConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    AssetDescriptor, AssetFormat, GalleryImage, ImageFilter, ImageResponse, NewImage, Page,
    PageRequest,
};
