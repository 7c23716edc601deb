//! Configuration module
//!
//! Settings are read once at process startup from the environment (and an
//! optional `.env` file) and validated before anything else is initialized.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::AssetFormat;

const SERVER_PORT: u16 = 4000;
const MAX_UPLOAD_MB: usize = 20;
const THUMBNAIL_SIZE: u32 = 512;
const REMOTE_FETCH_TIMEOUT_SECS: u64 = 15;
const RESULTS_PER_PAGE: u32 = 20;
const RATE_LIMIT_PER_MINUTE: u32 = 50;
const MIN_JWT_SECRET_LEN: usize = 32;

/// Console log output style.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Where and how media is stored.
#[derive(Clone, Debug)]
pub struct MediaConfig {
    pub image_dir: PathBuf,
    pub thumbnail_dir: PathBuf,
    pub thumbnail_size: u32,
    pub max_upload_bytes: usize,
    pub allowed_formats: Vec<AssetFormat>,
}

/// Remote import settings.
#[derive(Clone, Debug)]
pub struct RemoteFetchConfig {
    pub timeout: Duration,
    pub url_allowlist: Option<Vec<String>>,
    pub allow_private_ips: bool,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub results_per_page: u32,
    pub rate_limit_enabled: bool,
    pub rate_limit_per_minute: u32,
    /// Proxies in front of the server whose `X-Forwarded-For` entries are trusted.
    pub trusted_proxy_count: usize,
    pub log_format: LogFormat,
    pub media: MediaConfig,
    pub remote: RemoteFetchConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let image_dir = PathBuf::from(
            env::var("IMAGE_DIR").unwrap_or_else(|_| "./data/images".to_string()),
        );
        let thumbnail_dir = env::var("THUMBNAIL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| image_dir.join("thumbnails"));

        let allowed_formats = parse_formats(
            &env::var("ALLOWED_FORMATS").unwrap_or_else(|_| "png,jpeg,webp".to_string()),
        )?;

        let max_upload_mb = env_or("MAX_UPLOAD_MB", MAX_UPLOAD_MB);

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            results_per_page: env_or("RESULTS_PER_PAGE", RESULTS_PER_PAGE),
            rate_limit_enabled: env_flag("ENABLE_RATE_LIMITS", true),
            rate_limit_per_minute: env_or("RATE_LIMIT_PER_MINUTE", RATE_LIMIT_PER_MINUTE),
            trusted_proxy_count: env_or("TRUSTED_PROXY_COUNT", 0),
            log_format: match env::var("LOG_FORMAT").map(|s| s.to_lowercase()) {
                Ok(f) if f == "json" => LogFormat::Json,
                _ => LogFormat::Compact,
            },
            media: MediaConfig {
                image_dir,
                thumbnail_dir,
                thumbnail_size: env_or("THUMBNAIL_SIZE", THUMBNAIL_SIZE),
                max_upload_bytes: max_upload_mb * 1024 * 1024,
                allowed_formats,
            },
            remote: RemoteFetchConfig {
                timeout: Duration::from_secs(env_or(
                    "REMOTE_FETCH_TIMEOUT_SECS",
                    REMOTE_FETCH_TIMEOUT_SECS,
                )),
                url_allowlist: env::var("URL_IMPORT_ALLOWLIST").ok().and_then(|s| {
                    let domains: Vec<String> = s
                        .split(',')
                        .map(|d| d.trim().to_lowercase())
                        .filter(|d| !d.is_empty())
                        .collect();
                    (!domains.is_empty()).then_some(domains)
                }),
                allow_private_ips: env_flag("ALLOW_PRIVATE_URL_IMPORTS", false),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            ));
        }

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.media.thumbnail_size == 0 {
            return Err(anyhow::anyhow!("THUMBNAIL_SIZE must be greater than zero"));
        }

        if self.media.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_MB must be greater than zero"));
        }

        if !self.media.allowed_formats.contains(&AssetFormat::Png) {
            return Err(anyhow::anyhow!(
                "ALLOWED_FORMATS must include png (the fallback format)"
            ));
        }

        if self.results_per_page == 0 {
            return Err(anyhow::anyhow!("RESULTS_PER_PAGE must be greater than zero"));
        }

        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(default)
}

/// Parse a comma-separated format list such as `png,jpeg,webp`.
pub fn parse_formats(s: &str) -> Result<Vec<AssetFormat>, anyhow::Error> {
    let mut formats = Vec::new();
    for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let format = AssetFormat::parse(name)
            .ok_or_else(|| anyhow::anyhow!("ALLOWED_FORMATS contains unsupported format: {}", name))?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}
