use crate::auth::Caller;
use crate::constants::{DEFAULT_IMPORT_TITLE, DEFAULT_UPLOAD_TITLE};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::{IngestionService, MediaLifecycleService};
use crate::state::AppState;
use crate::utils::ssrf_validation::validate_url_for_ssrf;
use crate::utils::upload::{deserialize_flag, read_image_form, validate_file_size};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gallery_core::models::{
    AssetFormat, GalleryImage, ImageFilter, ImageResponse, NewImage, PageRequest,
};
use gallery_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListImagesQuery {
    /// Only images of this owner. Other owners' private images stay hidden.
    pub owner_id: Option<i64>,
    pub folder: Option<String>,
    /// PNG, JPEG or WEBP
    pub format: Option<String>,
    /// Search term matched against title and tags, or an image id when numeric
    pub q: Option<String>,
    /// Substring of the comma-separated tags
    pub tag: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImageListResponse {
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
    pub pages: u32,
    pub items: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportImageRequest {
    #[serde(alias = "image_url")]
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub folder: Option<String>,
    pub tags: Option<String>,
    /// JSON boolean, or one of `true`, `1`, `yes`, `on` as a string
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_public: Option<bool>,
    /// Output format; detected from the downloaded bytes when absent.
    pub format: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn find_image(state: &AppState, id: i64) -> Result<GalleryImage, HttpAppError> {
    state
        .images
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Image {} not found", id)).into())
}

fn ensure_can_modify(image: &GalleryImage, caller: &Caller) -> Result<(), AppError> {
    if image.can_be_modified_by(caller.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the owner can modify this image".to_string(),
        ))
    }
}

#[utoipa::path(
    post,
    path = "/api/v0/images",
    tag = "images",
    request_body(content = inline(Object), content_type = "multipart/form-data", description = "Fields: file (required), title, description, folder, tags, is_public, format, source_url"),
    responses(
        (status = 201, description = "Image uploaded successfully", body = ImageResponse),
        (status = 400, description = "Invalid image, format or form", body = ErrorResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = ?caller.user_id, operation = "upload_image"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let form = read_image_form(multipart, state.config.media.max_upload_bytes).await?;
    let file = form
        .file
        .ok_or_else(|| AppError::InvalidInput("No image file provided".to_string()))?;

    let descriptor = IngestionService::store_image(
        &state.media,
        file.data,
        file.file_name.as_deref(),
        caller.user_id,
        form.format.as_deref(),
    )
    .await?;

    let new_image = NewImage {
        owner_id: caller.user_id,
        title: form
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_TITLE.to_string()),
        description: form.description.unwrap_or_default(),
        folder: form.folder.unwrap_or_default(),
        tags: form.tags.unwrap_or_default(),
        is_public: form.is_public.unwrap_or(false),
        source_url: form.source_url,
        descriptor: descriptor.clone(),
    };

    let image = match state.images.create(new_image).await {
        Ok(image) => image,
        Err(e) => {
            MediaLifecycleService::delete_asset_files(&state.media, &descriptor).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        image_id = image.id,
        relative_path = %image.descriptor.relative_path,
        "Image uploaded"
    );

    Ok((StatusCode::CREATED, Json(ImageResponse::from(image))).into_response())
}

#[utoipa::path(
    post,
    path = "/api/v0/images/import",
    tag = "images",
    request_body = ImportImageRequest,
    responses(
        (status = 201, description = "Image imported successfully", body = ImageResponse),
        (status = 400, description = "Invalid URL, unreachable source or invalid image", body = ErrorResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(user_id = ?caller.user_id, url = %request.url, operation = "import_image"))]
pub async fn import_image(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ValidatedJson(request): ValidatedJson<ImportImageRequest>,
) -> Result<Response, HttpAppError> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(AppError::InvalidInput("url is required".to_string()).into());
    }

    let remote = &state.config.remote;
    validate_url_for_ssrf(url, remote.allow_private_ips, remote.url_allowlist.as_deref())
        .await
        .map_err(|e| {
            tracing::warn!(url = %url, error = %e, "SSRF validation failed");
            AppError::InvalidInput(format!("URL validation failed: {}", e))
        })?;

    let fetched = state.media.fetcher.fetch(url).await?;
    validate_file_size(fetched.data.len(), state.config.media.max_upload_bytes)?;

    let descriptor = IngestionService::store_image(
        &state.media,
        fetched.data.to_vec(),
        Some(&fetched.filename),
        caller.user_id,
        request.format.as_deref(),
    )
    .await?;

    let new_image = NewImage {
        owner_id: caller.user_id,
        title: request
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_IMPORT_TITLE.to_string()),
        description: request.description.unwrap_or_default().trim().to_string(),
        folder: request.folder.unwrap_or_default().trim().to_string(),
        tags: request.tags.unwrap_or_default().trim().to_string(),
        is_public: request.is_public.unwrap_or(false),
        source_url: Some(url.to_string()),
        descriptor: descriptor.clone(),
    };

    let image = match state.images.create(new_image).await {
        Ok(image) => image,
        Err(e) => {
            MediaLifecycleService::delete_asset_files(&state.media, &descriptor).await;
            return Err(e.into());
        }
    };

    tracing::info!(image_id = image.id, "Image imported from URL");

    Ok((StatusCode::CREATED, Json(ImageResponse::from(image))).into_response())
}

#[utoipa::path(
    get,
    path = "/api/v0/images",
    tag = "images",
    params(ListImagesQuery),
    responses(
        (status = 200, description = "Page of images, newest first", body = ImageListResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(user_id = ?caller.user_id))]
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<ListImagesQuery>,
) -> Result<Json<ImageListResponse>, HttpAppError> {
    let format = match query.format.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => Some(
            AssetFormat::parse(f)
                .ok_or_else(|| AppError::InvalidInput(format!("Unknown format filter: {}", f)))?,
        ),
        None => None,
    };

    // Private images only show up when callers list their own.
    let own_listing = query.owner_id.is_some() && query.owner_id == caller.user_id;
    let filter = ImageFilter {
        owner_id: query.owner_id,
        folder: non_empty(query.folder),
        format,
        q: non_empty(query.q),
        tag: non_empty(query.tag),
        public_only: !own_listing,
    };

    let page_request = PageRequest::new(query.page, query.per_page, state.config.results_per_page);
    let page = state.images.list(filter, page_request).await?.map(ImageResponse::from);

    Ok(Json(ImageListResponse {
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        pages: page.pages,
        items: page.items,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v0/images/{id}",
    tag = "images",
    params(("id" = i64, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image metadata", body = ImageResponse),
        (status = 403, description = "Private image of another user", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = ?caller.user_id))]
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<ImageResponse>, HttpAppError> {
    let image = find_image(&state, id).await?;

    if !image.is_visible_to(caller.user_id) {
        return Err(AppError::Forbidden("Access denied".to_string()).into());
    }

    Ok(Json(ImageResponse::from(image)))
}

#[utoipa::path(
    put,
    path = "/api/v0/images/{id}",
    tag = "images",
    params(("id" = i64, Path, description = "Image ID")),
    request_body(content = inline(Object), content_type = "multipart/form-data", description = "Any of: file, title, description, folder, tags, is_public, format"),
    responses(
        (status = 200, description = "Image updated", body = ImageResponse),
        (status = 400, description = "Invalid image, format or form", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = ?caller.user_id, operation = "update_image"))]
pub async fn update_image(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ImageResponse>, HttpAppError> {
    let mut image = find_image(&state, id).await?;
    ensure_can_modify(&image, &caller)?;

    let form = read_image_form(multipart, state.config.media.max_upload_bytes).await?;

    if let Some(title) = form.title {
        image.title = title;
    }
    if let Some(description) = form.description {
        image.description = description;
    }
    if let Some(folder) = form.folder {
        image.folder = folder;
    }
    if let Some(tags) = form.tags {
        image.tags = tags;
    }
    if let Some(is_public) = form.is_public {
        image.is_public = is_public;
    }
    if form.source_url.is_some() {
        image.source_url = form.source_url;
    }

    // New files are fully written before the record points at them; the old
    // ones are removed only after the record has moved on.
    let superseded = match form.file {
        Some(file) => {
            let descriptor = IngestionService::store_image(
                &state.media,
                file.data,
                file.file_name.as_deref(),
                image.owner_id,
                form.format.as_deref(),
            )
            .await?;
            Some(std::mem::replace(&mut image.descriptor, descriptor))
        }
        None => None,
    };

    let updated = match state.images.update(image.clone()).await {
        Ok(updated) => updated,
        Err(e) => {
            if superseded.is_some() {
                MediaLifecycleService::delete_asset_files(&state.media, &image.descriptor).await;
            }
            return Err(e.into());
        }
    };

    let replaced_file = superseded.is_some();
    if let Some(old) = superseded {
        MediaLifecycleService::delete_asset_files(&state.media, &old).await;
    }

    tracing::info!(image_id = updated.id, replaced_file, "Image updated");

    Ok(Json(ImageResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v0/images/{id}",
    tag = "images",
    params(("id" = i64, Path, description = "Image ID")),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(user_id = ?caller.user_id))]
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<StatusCode, HttpAppError> {
    let image = find_image(&state, id).await?;
    ensure_can_modify(&image, &caller)?;

    if let Some(removed) = state.images.delete(id).await? {
        MediaLifecycleService::delete_asset_files(&state.media, &removed.descriptor).await;
        tracing::info!(image_id = id, "Image deleted");
    }

    Ok(StatusCode::NO_CONTENT)
}
