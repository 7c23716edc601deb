//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use gallery_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format)
        .context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = %config.environment,
        image_dir = %config.media.image_dir.display(),
        thumbnail_dir = %config.media.thumbnail_dir.display(),
        "Configuration loaded and validated successfully"
    );

    build_app(config).await
}

/// Build state and router without touching the global subscriber.
pub async fn build_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    let state = services::initialize_services(&config).await?;
    let router = routes::setup_routes(&config, state.clone())?;
    Ok((state, router))
}
