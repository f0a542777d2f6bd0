//! Per-record photo acquisition pipeline.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::{
    FetchedPhoto, PhotoAcquisition, PhotoError, PhotoFailure, PhotoFetcher, PhotoRef,
    ProcessedPhoto, MAX_PHOTO_BYTES,
};
use crate::metrics;
use crate::storage::{photo_key, ObjectStore};

/// Outcome of one photo, including whether its bytes arrived.
struct PhotoOutcome {
    downloaded: bool,
    result: Result<ProcessedPhoto, PhotoError>,
}

/// Fetches, validates and stores the photos of one record.
pub struct PhotoPipeline {
    fetcher: Arc<dyn PhotoFetcher>,
    store: Arc<dyn ObjectStore>,
    workers: usize,
    max_bytes: u64,
}

impl PhotoPipeline {
    /// Create a pipeline fetching at most `workers` photos at a time.
    pub fn new(fetcher: Arc<dyn PhotoFetcher>, store: Arc<dyn ObjectStore>, workers: usize) -> Self {
        Self {
            fetcher,
            store,
            workers: workers.max(1),
            max_bytes: MAX_PHOTO_BYTES,
        }
    }

    /// Override the per-photo size cap.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Acquire every photo, collecting failures instead of stopping on them.
    ///
    /// Successes and failures both keep the order of `photos`; each failure
    /// carries the index of the photo it belongs to.
    pub async fn acquire(&self, photos: &[PhotoRef]) -> PhotoAcquisition {
        let mut acquisition = PhotoAcquisition::default();
        if photos.is_empty() {
            return acquisition;
        }

        let outcomes: Vec<(usize, PhotoRef, PhotoOutcome)> =
            stream::iter(photos.iter().cloned().enumerate())
                .map(|(index, photo)| self.acquire_indexed(index, photo))
                .buffered(self.workers)
                .collect()
                .await;

        for (index, photo, outcome) in outcomes {
            if outcome.downloaded {
                acquisition.downloaded += 1;
            }
            match outcome.result {
                Ok(processed) => {
                    acquisition.uploaded += 1;
                    metrics::PHOTOS_TOTAL.with_label_values(&["stored"]).inc();
                    metrics::PHOTO_BYTES.inc_by(processed.size_bytes);
                    acquisition.succeeded.push(processed);
                }
                Err(e) => {
                    warn!(index, url = %photo.url, error = %e, "Photo acquisition failed");
                    metrics::PHOTOS_TOTAL.with_label_values(&["failed"]).inc();
                    acquisition.failed.push(PhotoFailure {
                        index,
                        url: photo.url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        acquisition
    }

    async fn acquire_indexed(&self, index: usize, photo: PhotoRef) -> (usize, PhotoRef, PhotoOutcome) {
        let outcome = self.acquire_one(&photo).await;
        (index, photo, outcome)
    }

    async fn acquire_one(&self, photo: &PhotoRef) -> PhotoOutcome {
        let mut downloaded = false;
        let result = self.try_acquire(photo, &mut downloaded).await;
        PhotoOutcome { downloaded, result }
    }

    async fn try_acquire(
        &self,
        photo: &PhotoRef,
        downloaded: &mut bool,
    ) -> Result<ProcessedPhoto, PhotoError> {
        let probe = self.fetcher.probe(&photo.url).await?;
        if let Some(content_type) = &probe.content_type {
            if !is_image_content_type(content_type) {
                return Err(PhotoError::NotAnImage(content_type.clone()));
            }
        }
        if let Some(size) = probe.content_length {
            if size > self.max_bytes {
                return Err(PhotoError::TooLarge {
                    size,
                    max: self.max_bytes,
                });
            }
        }

        let fetched = self.fetcher.download(&photo.url, self.max_bytes).await?;
        *downloaded = true;

        let size_bytes = fetched.bytes.len() as u64;
        if size_bytes > self.max_bytes {
            return Err(PhotoError::TooLarge {
                size: size_bytes,
                max: self.max_bytes,
            });
        }

        let (format, mime) = detect_format(&fetched)?;
        let key = photo_key(Utc::now(), &fetched.bytes, &format);

        self.store
            .put(&key, &fetched.bytes, &mime)
            .await
            .map_err(|e| PhotoError::Storage(e.to_string()))?;

        debug!(url = %photo.url, key = %key, size_bytes, "Photo stored");

        Ok(ProcessedPhoto {
            url: self.store.url_for(&key),
            thumbnail_url: None,
            caption: photo.caption.clone(),
            credit: photo.credit.clone(),
            format,
            size_bytes,
            original_url: photo.url.clone(),
            storage_key: key,
        })
    }
}

/// Media type without parameters, lowercased.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_image_content_type(content_type: &str) -> bool {
    essence(content_type).starts_with("image/")
}

/// Raster formats accepted for storage, by detected media type.
const RASTER_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/avif",
    "image/heif",
    "image/tiff",
    "image/bmp",
];

/// Work out the image format and media type from the downloaded bytes.
///
/// Only bytes that carry a known raster signature are accepted. The declared
/// content type must still be an image type, and it never overrides what the
/// bytes say. SVG and other scriptable documents are rejected.
fn detect_format(fetched: &FetchedPhoto) -> Result<(String, String), PhotoError> {
    if let Some(declared) = fetched.content_type.as_deref().map(essence) {
        if !declared.starts_with("image/") {
            return Err(PhotoError::NotAnImage(declared));
        }
    }

    let kind = infer::get(&fetched.bytes)
        .ok_or_else(|| PhotoError::NotAnImage("unrecognized content".to_string()))?;
    if !RASTER_TYPES.contains(&kind.mime_type()) {
        return Err(PhotoError::NotAnImage(kind.mime_type().to_string()));
    }
    Ok((kind.extension().to_string(), kind.mime_type().to_string()))
}
