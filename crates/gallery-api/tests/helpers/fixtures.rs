//! Test fixtures: synthesized images and multipart forms.

use axum_test::multipart::{MultipartForm, Part};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Solid-color PNG of the given dimensions.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([200, 40, 90, 255]),
    ));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .expect("Failed to encode test PNG");
    buffer.into_inner()
}

/// Upload form with a single PNG `file` field.
pub fn png_form(file_name: &str, data: Vec<u8>) -> MultipartForm {
    let part = Part::bytes(data)
        .file_name(file_name.to_string())
        .mime_type("image/png");
    MultipartForm::new().add_part("file", part)
}
