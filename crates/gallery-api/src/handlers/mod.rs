pub mod images;
pub mod media;
