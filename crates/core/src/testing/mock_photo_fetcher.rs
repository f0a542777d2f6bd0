//! Mock photo fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::photos::{FetchedPhoto, PhotoError, PhotoFetcher, PhotoProbe};

/// Canned responses for one URL.
#[derive(Debug, Clone)]
pub struct MockPhotoResponse {
    pub probe: Result<PhotoProbe, PhotoError>,
    pub download: Result<FetchedPhoto, PhotoError>,
}

/// A recorded fetch for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedFetch {
    Probe(String),
    Download(String),
}

/// Mock implementation of the PhotoFetcher trait.
///
/// URLs without a configured response behave like an unreachable host.
///
/// # Example
///
/// ```rust,ignore
/// use mosaic_core::testing::{MockPhotoFetcher, fixtures};
///
/// let fetcher = MockPhotoFetcher::new();
/// fetcher.add_image("https://example.com/a.png", fixtures::png_bytes(), "image/png").await;
///
/// let probe = fetcher.probe("https://example.com/a.png").await?;
/// assert_eq!(probe.content_type.as_deref(), Some("image/png"));
/// ```
#[derive(Debug, Default)]
pub struct MockPhotoFetcher {
    responses: Arc<RwLock<HashMap<String, MockPhotoResponse>>>,
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl MockPhotoFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` with `content_type` from both probe and download.
    pub async fn add_image(&self, url: &str, bytes: Vec<u8>, content_type: &str) {
        let response = MockPhotoResponse {
            probe: Ok(PhotoProbe {
                content_type: Some(content_type.to_string()),
                content_length: Some(bytes.len() as u64),
            }),
            download: Ok(FetchedPhoto {
                bytes,
                content_type: Some(content_type.to_string()),
            }),
        };
        self.add_response(url, response).await;
    }

    /// Configure the full response for a URL.
    pub async fn add_response(&self, url: &str, response: MockPhotoResponse) {
        self.responses
            .write()
            .await
            .insert(url.to_string(), response);
    }

    /// Make every request for `url` fail with `error`.
    pub async fn add_failure(&self, url: &str, error: PhotoError) {
        let response = MockPhotoResponse {
            probe: Err(error.clone()),
            download: Err(error),
        };
        self.add_response(url, response).await;
    }

    /// Delay every probe and download by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Get recorded fetches in call order.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    /// Number of downloads performed.
    pub async fn download_count(&self) -> usize {
        self.fetches
            .read()
            .await
            .iter()
            .filter(|f| matches!(f, RecordedFetch::Download(_)))
            .count()
    }

    async fn wait(&self) {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn response_for(&self, url: &str) -> Option<MockPhotoResponse> {
        self.responses.read().await.get(url).cloned()
    }
}

#[async_trait]
impl PhotoFetcher for MockPhotoFetcher {
    async fn probe(&self, url: &str) -> Result<PhotoProbe, PhotoError> {
        self.fetches
            .write()
            .await
            .push(RecordedFetch::Probe(url.to_string()));
        self.wait().await;

        match self.response_for(url).await {
            Some(response) => response.probe,
            None => Err(PhotoError::Unreachable(format!("no route to {}", url))),
        }
    }

    async fn download(&self, url: &str, max_bytes: u64) -> Result<FetchedPhoto, PhotoError> {
        self.fetches
            .write()
            .await
            .push(RecordedFetch::Download(url.to_string()));
        self.wait().await;

        let fetched = match self.response_for(url).await {
            Some(response) => response.download?,
            None => return Err(PhotoError::Unreachable(format!("no route to {}", url))),
        };

        let size = fetched.bytes.len() as u64;
        if size > max_bytes {
            return Err(PhotoError::TooLarge {
                size,
                max: max_bytes,
            });
        }
        Ok(fetched)
    }
}
