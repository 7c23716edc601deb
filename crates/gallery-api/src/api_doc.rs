//! OpenAPI documentation, served at `/api/v0/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use gallery_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gallery API",
        version = "0.1.0",
        description = "Image gallery backend (v0): multipart uploads and URL imports are re-encoded to PNG, JPEG or WEBP with a bounded thumbnail, then served back from local storage."
    ),
    paths(
        // Images
        handlers::images::upload_image,
        handlers::images::import_image,
        handlers::images::list_images,
        handlers::images::get_image,
        handlers::images::update_image,
        handlers::images::delete_image,
        // Media
        handlers::media::serve_image,
        handlers::media::serve_thumbnail,
        handlers::media::download_image,
    ),
    components(
        schemas(
            models::ImageResponse,
            models::AssetFormat,
            handlers::images::ImageListResponse,
            handlers::images::ImportImageRequest,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "images", description = "Image records and ingestion"),
        (name = "media", description = "Stored originals and thumbnails"),
    )
)]
pub struct ApiDoc;
