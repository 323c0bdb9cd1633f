//! Durable storage for uploaded document bytes.

use async_trait::async_trait;
use log::debug;
use std::path::PathBuf;

use crate::errors::{Error, Result};

/// Byte storage behind the knowledge store. Paths returned by [`FileStore::save`]
/// are the only ones accepted by the other methods.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Writes `bytes` under `stored_name` and returns its storage path.
    async fn save(&self, stored_name: &str, bytes: &[u8]) -> Result<String>;

    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    async fn remove(&self, path: &str) -> Result<()>;
}

/// Stores files in a directory on the local filesystem.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, stored_name: &str, bytes: &[u8]) -> Result<String> {
        if stored_name.contains('/') || stored_name.contains('\\') || stored_name.contains("..") {
            return Err(Error::invalid_input(format!(
                "Invalid stored file name: {}",
                stored_name
            )));
        }
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(stored_name);
        tokio::fs::write(&path, bytes).await?;
        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(path.to_string_lossy().to_string())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn remove(&self, path: &str) -> Result<()> {
        Ok(tokio::fs::remove_file(path).await?)
    }
}
