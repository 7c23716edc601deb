//! Raw asset serving. Originals and thumbnails are addressed by their
//! storage-relative path; the random token in every stored file name is what
//! keeps them unguessable, so these routes carry no authorization.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use gallery_core::AppError;
use gallery_storage::LocalStorage;
use std::sync::Arc;

/// Quote-safe value for `Content-Disposition: attachment`.
fn attachment_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

async fn serve(storage: &LocalStorage, path: &str, attachment: bool) -> Result<Response, HttpAppError> {
    let stored = storage.open(path).await?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, stored.content_type.as_str())
        .header(header::CONTENT_LENGTH, stored.len)
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff");

    if attachment {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            attachment_disposition(&stored.file_name),
        );
    }

    builder
        .body(Body::from_stream(stored.into_stream()))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })
}

#[utoipa::path(
    get,
    path = "/media/images/{path}",
    tag = "media",
    params(("path" = String, Path, description = "Stored path of the original")),
    responses(
        (status = 200, description = "Image bytes", content_type = "application/octet-stream"),
        (status = 403, description = "Path escapes the image directory", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "serve_image"))]
pub async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, HttpAppError> {
    serve(state.media.images(), &path, false).await
}

#[utoipa::path(
    get,
    path = "/media/thumbnails/{path}",
    tag = "media",
    params(("path" = String, Path, description = "Stored path of the thumbnail")),
    responses(
        (status = 200, description = "Thumbnail bytes", content_type = "application/octet-stream"),
        (status = 403, description = "Path escapes the thumbnail directory", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "serve_thumbnail"))]
pub async fn serve_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, HttpAppError> {
    serve(state.media.thumbnail_storage(), &path, false).await
}

#[utoipa::path(
    get,
    path = "/media/download/{path}",
    tag = "media",
    params(("path" = String, Path, description = "Stored path of the original")),
    responses(
        (status = 200, description = "Image bytes as an attachment", content_type = "application/octet-stream"),
        (status = 403, description = "Path escapes the image directory", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "download_image"))]
pub async fn download_image(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, HttpAppError> {
    serve(state.media.images(), &path, true).await
}
