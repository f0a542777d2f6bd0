//! Object storage for acquired photos.
//!
//! The photo pipeline only needs put-by-key and a public URL for a key, so
//! that is all [`ObjectStore`] exposes.

mod fs_store;

pub use fs_store::FsObjectStore;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Errors from object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for durable object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Public URL for a stored key.
    fn url_for(&self, key: &str) -> String;
}

/// Generate a collision-resistant key for a photo.
///
/// Layout: `photos/YYYY/MM/<uuid>-<first 16 hex chars of sha256>.<ext>`.
pub fn photo_key(now: DateTime<Utc>, bytes: &[u8], extension: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(bytes));
    format!(
        "photos/{:04}/{:02}/{}-{}.{}",
        now.year(),
        now.month(),
        Uuid::new_v4(),
        &digest[..16],
        extension
    )
}

/// Reject keys that could escape the storage root.
pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
