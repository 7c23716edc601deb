pub mod asset;
pub mod image;
pub mod pagination;

pub use asset::{AssetDescriptor, AssetFormat};
pub use image::{GalleryImage, ImageFilter, ImageResponse, NewImage};
pub use pagination::{Page, PageRequest};
