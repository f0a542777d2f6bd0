//! Remote photo fetching.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use super::{FetchedPhoto, PhotoError, PhotoProbe};
use crate::config::ImportSettings;

/// Trait for fetching remote photos.
#[async_trait]
pub trait PhotoFetcher: Send + Sync {
    /// Issue a content-type probe without downloading the body.
    async fn probe(&self, url: &str) -> Result<PhotoProbe, PhotoError>;

    /// Download the full body, failing once more than `max_bytes` arrive.
    async fn download(&self, url: &str, max_bytes: u64) -> Result<FetchedPhoto, PhotoError>;
}

/// HTTP photo fetcher backed by reqwest.
pub struct HttpPhotoFetcher {
    client: Client,
}

impl HttpPhotoFetcher {
    /// Create a fetcher with browser-like headers and the configured timeout.
    pub fn new(settings: &ImportSettings) -> Result<Self, PhotoError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("image/avif,image/webp,image/png,image/jpeg,image/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(&settings.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.photo_timeout_secs))
            .build()
            .map_err(|e| PhotoError::Unreachable(e.to_string()))?;

        Ok(Self { client })
    }

    fn map_request_error(e: reqwest::Error) -> PhotoError {
        if e.is_timeout() {
            PhotoError::Timeout
        } else {
            PhotoError::Unreachable(e.to_string())
        }
    }

    fn header_content_type(response: &Response) -> Option<String> {
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn header_content_length(response: &Response) -> Option<u64> {
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
    }
}

#[async_trait]
impl PhotoFetcher for HttpPhotoFetcher {
    async fn probe(&self, url: &str) -> Result<PhotoProbe, PhotoError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        // Plenty of origins refuse HEAD but serve GET fine
        if matches!(
            status,
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::FORBIDDEN | StatusCode::NOT_IMPLEMENTED
        ) {
            debug!(url = %url, status = %status, "HEAD rejected, probe inconclusive");
            return Ok(PhotoProbe::inconclusive());
        }

        if !status.is_success() {
            return Err(PhotoError::HttpStatus(status.as_u16()));
        }

        Ok(PhotoProbe {
            content_type: Self::header_content_type(&response),
            content_length: Self::header_content_length(&response),
        })
    }

    async fn download(&self, url: &str, max_bytes: u64) -> Result<FetchedPhoto, PhotoError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PhotoError::HttpStatus(status.as_u16()));
        }

        if let Some(size) = Self::header_content_length(&response) {
            if size > max_bytes {
                return Err(PhotoError::TooLarge {
                    size,
                    max: max_bytes,
                });
            }
        }

        let content_type = Self::header_content_type(&response);
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(Self::map_request_error)? {
            bytes.extend_from_slice(&chunk);
            if bytes.len() as u64 > max_bytes {
                return Err(PhotoError::TooLarge {
                    size: bytes.len() as u64,
                    max: max_bytes,
                });
            }
        }

        debug!(url = %url, size = bytes.len(), "Photo downloaded");

        Ok(FetchedPhoto {
            bytes,
            content_type,
        })
    }
}
