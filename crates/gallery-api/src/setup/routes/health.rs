//! Health check handler.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage: &'static str,
}

/// Reports unhealthy when either storage root has gone missing.
pub(super) async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let images_ok = tokio::fs::metadata(state.media.images().root())
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    let thumbnails_ok = tokio::fs::metadata(state.media.thumbnail_storage().root())
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    let healthy = images_ok && thumbnails_ok;
    if !healthy {
        tracing::error!(images_ok, thumbnails_ok, "Storage health check failed");
    }

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthCheckResponse {
            status: if healthy { "healthy" } else { "unhealthy" },
            version: env!("CARGO_PKG_VERSION"),
            storage: if healthy { "healthy" } else { "unavailable" },
        }),
    )
}
