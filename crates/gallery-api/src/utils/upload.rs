//! Multipart form handling for image uploads and updates

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use gallery_core::AppError;
use serde::{Deserialize, Deserializer};

/// Image file carried by a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    pub data: Vec<u8>,
    pub file_name: Option<String>,
}

/// Fields of an upload or update form. Absent fields are `None` so updates
/// can tell "not sent" from "sent empty".
#[derive(Debug, Default)]
pub struct ImageForm {
    pub file: Option<UploadedFile>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub folder: Option<String>,
    pub tags: Option<String>,
    pub is_public: Option<bool>,
    pub format: Option<String>,
    pub source_url: Option<String>,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidInput(format!("Failed to read multipart: {}", err.body_text()))
    }
}

/// Read every field of the form. Only one file field (named `file`, or
/// `image` for older clients) is accepted; unknown fields are ignored.
pub async fn read_image_form(
    mut multipart: Multipart,
    max_file_size: usize,
) -> Result<ImageForm, AppError> {
    let mut form = ImageForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            "file" | "image" => {
                if form.file.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .filter(|s| !s.is_empty());
                let data = field.bytes().await.map_err(multipart_error)?;
                validate_file_size(data.len(), max_file_size)?;
                form.file = Some(UploadedFile {
                    data: data.to_vec(),
                    file_name,
                });
            }
            "title" | "description" | "folder" | "tags" | "is_public" | "format" | "source_url" => {
                let value = field.text().await.map_err(multipart_error)?;
                let value = value.trim().to_string();
                match field_name.as_str() {
                    "title" => form.title = Some(value),
                    "description" => form.description = Some(value),
                    "folder" => form.folder = Some(value),
                    "tags" => form.tags = Some(value),
                    "is_public" => form.is_public = Some(parse_flag(&value)),
                    "source_url" => form.source_url = Some(value).filter(|u| !u.is_empty()),
                    _ => form.format = Some(value).filter(|f| !f.is_empty()),
                }
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

/// Validate file size
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Form-style boolean: `true`, `1`, `yes` and `on` (any case) are true.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Text(String),
}

/// Serde helper for optional JSON flags sent either as booleans or as
/// form-style strings understood by [`parse_flag`].
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<FlagValue>::deserialize(deserializer)?.map(|value| match value {
            FlagValue::Bool(flag) => flag,
            FlagValue::Text(text) => parse_flag(&text),
        }),
    )
}
