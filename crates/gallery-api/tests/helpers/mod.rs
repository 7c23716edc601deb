//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p gallery-api`. Every test app gets
//! its own temp directories and in-memory repository.

pub mod auth;
pub mod fixtures;

use axum_test::TestServer;
use gallery_api::constants;
use gallery_api::setup;
use gallery_api::state::AppState;
use gallery_core::{AssetFormat, Config, LogFormat, MediaConfig, RemoteFetchConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server, state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn image_dir(&self) -> PathBuf {
        self.state.config.media.image_dir.clone()
    }

    pub fn thumbnail_dir(&self) -> PathBuf {
        self.state.config.media.thumbnail_dir.clone()
    }
}

/// Number of regular files anywhere under `dir`. A missing directory counts
/// as empty.
pub fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

pub fn test_config(temp_dir: &TempDir) -> Config {
    Config {
        server_port: 0,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        jwt_secret: auth::TEST_JWT_SECRET.to_string(),
        results_per_page: 20,
        rate_limit_enabled: false,
        rate_limit_per_minute: 50,
        trusted_proxy_count: 0,
        log_format: LogFormat::Compact,
        media: MediaConfig {
            image_dir: temp_dir.path().join("images"),
            thumbnail_dir: temp_dir.path().join("thumbnails"),
            thumbnail_size: 64,
            max_upload_bytes: 5 * 1024 * 1024,
            allowed_formats: AssetFormat::ALL.to_vec(),
        },
        remote: RemoteFetchConfig {
            timeout: Duration::from_secs(5),
            url_allowlist: None,
            allow_private_ips: false,
        },
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Build a test app after letting the caller adjust the default test config.
pub async fn setup_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = test_config(&temp_dir);
    configure(&mut config);
    config.validate().expect("Test config should be valid");

    let (state, router) = setup::build_app(config)
        .await
        .expect("Failed to build test app");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}
