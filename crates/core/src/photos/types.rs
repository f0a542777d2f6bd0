//! Types for photo acquisition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard cap on a single photo's size, 15 MB.
pub const MAX_PHOTO_BYTES: u64 = 15 * 1024 * 1024;

/// A photo referenced by an incoming artwork record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit: Option<String>,
}

impl PhotoRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            caption: None,
            credit: None,
        }
    }
}

/// A photo that was fetched, validated and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedPhoto {
    /// Durable URL of the stored copy.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit: Option<String>,
    /// Image format, e.g. "jpg" or "png".
    pub format: String,
    pub size_bytes: u64,
    /// URL the photo was fetched from.
    pub original_url: String,
    pub storage_key: String,
}

/// A photo that could not be acquired, correlated to its input index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoFailure {
    pub index: usize,
    pub url: String,
    pub reason: String,
}

/// Outcome of acquiring every photo of one record.
#[derive(Debug, Clone, Default)]
pub struct PhotoAcquisition {
    /// Stored photos, in input order.
    pub succeeded: Vec<ProcessedPhoto>,
    /// Failed photos, in input order.
    pub failed: Vec<PhotoFailure>,
    /// Photos whose bytes were fully downloaded.
    pub downloaded: u32,
    /// Photos written to object storage.
    pub uploaded: u32,
}

/// Result of a HEAD probe.
///
/// Both fields are `None` when the remote refused HEAD; the download
/// re-validates in that case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoProbe {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl PhotoProbe {
    /// Probe that carried no usable information.
    pub fn inconclusive() -> Self {
        Self::default()
    }
}

/// Bytes returned by a full download.
#[derive(Debug, Clone)]
pub struct FetchedPhoto {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Errors for a single photo.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PhotoError {
    #[error("Unreachable: {0}")]
    Unreachable(String),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Not an image: {0}")]
    NotAnImage(String),

    #[error("Photo too large: {size} bytes exceeds {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_ref_deserializes_optional_fields() {
        let photo: PhotoRef =
            serde_json::from_str(r#"{"url": "https://example.com/a.jpg"}"#).unwrap();
        assert_eq!(photo, PhotoRef::new("https://example.com/a.jpg"));
    }

    #[test]
    fn test_processed_photo_uses_camel_case() {
        let photo = ProcessedPhoto {
            url: "http://cdn/photos/a.jpg".to_string(),
            thumbnail_url: None,
            caption: Some("North face".to_string()),
            credit: None,
            format: "jpg".to_string(),
            size_bytes: 1024,
            original_url: "https://example.com/a.jpg".to_string(),
            storage_key: "photos/2024/05/a.jpg".to_string(),
        };
        let json = serde_json::to_value(&photo).unwrap();
        assert_eq!(json["sizeBytes"], 1024);
        assert_eq!(json["originalUrl"], "https://example.com/a.jpg");
        assert!(json.get("thumbnailUrl").is_none());
    }

    #[test]
    fn test_photo_error_display() {
        let err = PhotoError::TooLarge {
            size: 20,
            max: 10,
        };
        assert_eq!(err.to_string(), "Photo too large: 20 bytes exceeds 10 bytes");
        assert_eq!(PhotoError::HttpStatus(404).to_string(), "HTTP 404");
    }
}
