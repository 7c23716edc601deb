use gallery_core::AppError;
use thiserror::Error;

pub const OP_RESOLVE_FORMAT: &str = "resolve_format";
pub const OP_INGEST: &str = "ingest";
pub const OP_MAKE_THUMBNAIL: &str = "make_thumbnail";
pub const OP_FETCH: &str = "fetch";

/// Media pipeline errors. Every variant names the operation that failed.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{operation}: unsupported format '{format}'")]
    UnsupportedFormat {
        operation: &'static str,
        format: String,
    },

    #[error("{operation}: invalid image: {reason}")]
    InvalidImage {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation}: storage write failed: {reason}")]
    StorageWriteFailed {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation}: remote fetch failed: {reason}")]
    RemoteFetchFailed {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation}: processing task failed: {reason}")]
    TaskFailed {
        operation: &'static str,
        reason: String,
    },
}

impl MediaError {
    pub fn operation(&self) -> &'static str {
        match self {
            MediaError::UnsupportedFormat { operation, .. }
            | MediaError::InvalidImage { operation, .. }
            | MediaError::StorageWriteFailed { operation, .. }
            | MediaError::RemoteFetchFailed { operation, .. }
            | MediaError::TaskFailed { operation, .. } => operation,
        }
    }

    pub(crate) fn invalid_image(operation: &'static str, reason: impl ToString) -> Self {
        MediaError::InvalidImage {
            operation,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write_failed(operation: &'static str, reason: impl ToString) -> Self {
        MediaError::StorageWriteFailed {
            operation,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn fetch_failed(reason: impl ToString) -> Self {
        MediaError::RemoteFetchFailed {
            operation: OP_FETCH,
            reason: reason.to_string(),
        }
    }
}

/// Result type for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::UnsupportedFormat { operation, format } => {
                AppError::UnsupportedFormat { operation, format }
            }
            MediaError::InvalidImage { operation, reason } => {
                AppError::InvalidImage { operation, reason }
            }
            MediaError::StorageWriteFailed { operation, reason } => {
                AppError::StorageWriteFailed { operation, reason }
            }
            MediaError::RemoteFetchFailed { operation, reason } => {
                AppError::RemoteFetchFailed { operation, reason }
            }
            MediaError::TaskFailed { operation, reason } => {
                AppError::Internal(format!("{}: {}", operation, reason))
            }
        }
    }
}
