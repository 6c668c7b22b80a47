//! Remote source image download.
//!
//! Handles fetching images from HTTP/HTTPS URLs with retry logic.
//!
//! Uses a shared HTTP client so repeated imports reuse connections.

use image::DynamicImage;
use once_cell::sync::Lazy;
use std::time::Duration;
use thiserror::Error;

/// Shared HTTP client for all downloads
static HTTP_CLIENT: Lazy<Result<reqwest::Client, String>> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(1)
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| e.to_string())
});

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP client unavailable: {0}")]
    ClientError(String),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    #[error("Image decode failed: {0}")]
    DecodeError(#[from] image::ImageError),

    #[error("Empty URL")]
    EmptyUrl,

    #[error("Download timeout")]
    Timeout,
}

/// Download configuration
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Maximum number of attempts
    pub max_retries: u32,
    /// Base delay between retries (doubled each attempt)
    pub retry_delay: Duration,
    /// Append a timestamp query parameter so caches are bypassed
    pub bust_cache: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            bust_cache: true,
        }
    }
}

/// Whether a source string should be fetched over HTTP
pub fn is_remote(source: &str) -> bool {
    let source = source.trim_start();
    source.starts_with("http://") || source.starts_with("https://")
}

/// Append `t=<millis>` to a URL, respecting an existing query string
pub fn cache_busted_url(url: &str, millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, separator, millis)
}

/// Download an image from a URL using the shared HTTP client
pub async fn download_image(
    url: &str,
    config: &DownloadConfig,
) -> Result<DynamicImage, DownloadError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(DownloadError::EmptyUrl);
    }

    let client = (*HTTP_CLIENT)
        .as_ref()
        .map_err(|e| DownloadError::ClientError(e.clone()))?;

    let url = if config.bust_cache {
        cache_busted_url(url, chrono::Utc::now().timestamp_millis())
    } else {
        url.to_string()
    };

    tracing::info!("Downloading image from: {}", url);

    let bytes: bytes::Bytes = download_with_retry(client, &url, config).await?;

    tracing::debug!("Downloaded {} bytes, decoding image...", bytes.len());

    let img = decode_bytes(bytes).await?;
    tracing::info!("Image decoded: {}x{}", img.width(), img.height());

    Ok(img)
}

/// Decode a downloaded body off the async runtime
async fn decode_bytes(bytes: bytes::Bytes) -> Result<DynamicImage, DownloadError> {
    let decoded = tokio::task::spawn_blocking(move || -> image::ImageResult<DynamicImage> {
        image::ImageReader::new(std::io::Cursor::new(bytes))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .decode()
    })
    .await
    .map_err(|e| {
        DownloadError::DecodeError(image::ImageError::IoError(std::io::Error::other(e)))
    })?;

    Ok(decoded?)
}

/// Download with retry logic
async fn download_with_retry(
    client: &reqwest::Client,
    url: &str,
    config: &DownloadConfig,
) -> Result<bytes::Bytes, DownloadError> {
    let mut last_error = None;

    for attempt in 0..config.max_retries {
        if attempt > 0 {
            let delay = config.retry_delay * 2u32.pow(attempt - 1);
            tracing::debug!("Retry attempt {}/{}, waiting {:?}", attempt + 1, config.max_retries, delay);
            tokio::time::sleep(delay).await;
        }

        match client.get(url).send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    match response.bytes().await {
                        Ok(bytes) => return Ok(bytes),
                        Err(e) => {
                            tracing::warn!("Failed to read response body: {}", e);
                            last_error = Some(DownloadError::RequestError(e));
                        }
                    }
                } else {
                    tracing::warn!("HTTP error: {} for {}", status, url);
                    last_error = Some(DownloadError::HttpError {
                        status: status.as_u16(),
                    });
                }
            }
            Err(e) => {
                tracing::warn!("Request failed: {} for {}", e, url);
                last_error = Some(DownloadError::RequestError(e));
            }
        }
    }

    Err(last_error.unwrap_or(DownloadError::Timeout))
}
