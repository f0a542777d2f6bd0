//! Filesystem object store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{check_key, ObjectStore, StorageError};
use crate::config::StorageConfig;

/// Object store rooted at a local directory.
///
/// Objects are written to a temporary sibling and renamed into place, so
/// readers never see a partial file.
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.root.clone(), config.public_base_url.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        check_key(key)?;

        let destination = self.path_for(key);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp = destination.with_extension("partial");
        let mut file = fs::File::create(&temp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        if let Err(e) = fs::rename(&temp, &destination).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }

        debug!(key = %key, size = bytes.len(), content_type = %content_type, "Object stored");
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}
