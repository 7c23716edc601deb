//! Route configuration and setup.
//!
//! Image record routes live under [`API_PREFIX`]; raw media routes under
//! `/media`; health checks in [health](health).

mod health;

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::middleware::{rate_limit_middleware, HttpRateLimiter};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use gallery_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and metadata fields on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let mut app = Router::new()
        .merge(image_routes())
        .merge(media_routes())
        .route("/health", get(health::health_check))
        .route(
            &format!("{}/openapi.json", API_PREFIX),
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .layer(DefaultBodyLimit::max(
            config.media.max_upload_bytes + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    if config.rate_limit_enabled {
        let rate_limiter = setup_rate_limiter(config);
        app = app.layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));
    } else {
        tracing::warn!("HTTP rate limiting disabled");
    }

    Ok(app.with_state(state))
}

fn image_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/images", API_PREFIX),
            get(handlers::images::list_images).post(handlers::images::upload_image),
        )
        .route(
            &format!("{}/images/import", API_PREFIX),
            axum::routing::post(handlers::images::import_image),
        )
        .route(
            &format!("{}/images/{{id}}", API_PREFIX),
            get(handlers::images::get_image)
                .put(handlers::images::update_image)
                .delete(handlers::images::delete_image),
        )
}

fn media_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/media/images/{*path}", get(handlers::media::serve_image))
        .route("/media/thumbnails/{*path}", get(handlers::media::serve_thumbnail))
        .route("/media/download/{*path}", get(handlers::media::download_image))
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

fn setup_rate_limiter(config: &Config) -> Arc<HttpRateLimiter> {
    let rate_limiter = Arc::new(
        HttpRateLimiter::new(config.rate_limit_per_minute)
            .with_trusted_proxies(config.trusted_proxy_count),
    );

    let rate_limiter_for_cleanup = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter_for_cleanup.cleanup_expired_buckets().await;
        }
    });

    tracing::info!(
        rate_limit_per_minute = config.rate_limit_per_minute,
        trusted_proxy_count = config.trusted_proxy_count,
        "HTTP rate limiting enabled with sharded buckets and automatic cleanup (every 5 minutes)"
    );
    rate_limiter
}
