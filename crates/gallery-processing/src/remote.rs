use std::time::Duration;

use bytes::Bytes;
use percent_encoding::percent_decode_str;
use reqwest::Url;

use crate::error::{MediaError, MediaResult};

/// Filename used when a URL path has no usable basename.
pub const FALLBACK_FILENAME: &str = "remote.png";

/// Default retrieval timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Bytes retrieved from a remote URL plus the filename inferred from it.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub data: Bytes,
    pub filename: String,
}

/// Retrieves images over HTTP(S) with a bounded timeout.
#[derive(Clone)]
pub struct RemoteFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl RemoteFetcher {
    pub fn new(timeout: Duration) -> MediaResult<Self> {
        // Redirect targets never pass through the import URL checks, so a
        // 3xx is reported instead of followed.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| MediaError::fetch_failed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Download `url`. Network errors, non-success statuses and timeouts all
    /// surface as `RemoteFetchFailed`.
    #[tracing::instrument(skip(self), fields(timeout_secs = self.timeout.as_secs()))]
    pub async fn fetch(&self, url: &str) -> MediaResult<FetchedImage> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| MediaError::fetch_failed(format!("Invalid URL format: {}", e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(MediaError::fetch_failed(
                "Only HTTP and HTTPS URLs are allowed",
            ));
        }

        let start = std::time::Instant::now();
        let response = self.client.get(parsed.clone()).send().await.map_err(|e| {
            tracing::warn!(error = %e, url = %parsed, "Failed to download from URL");
            MediaError::fetch_failed(e)
        })?;

        let status = response.status();
        if status.is_redirection() {
            tracing::warn!(url = %parsed, status = %status, "Refusing to follow redirect");
            return Err(MediaError::fetch_failed(format!(
                "URL redirects ({}); redirects are not followed",
                status
            )));
        }
        if !status.is_success() {
            return Err(MediaError::fetch_failed(format!(
                "URL returned status code: {}",
                status
            )));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| MediaError::fetch_failed(format!("Failed to read response body: {}", e)))?;

        let filename = infer_filename(&parsed);

        tracing::info!(
            url = %parsed,
            filename = %filename,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote image downloaded"
        );

        Ok(FetchedImage { data, filename })
    }
}

/// Last non-empty path segment of `url`, percent-decoded.
pub fn infer_filename(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}
