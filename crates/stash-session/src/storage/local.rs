//! Local filesystem key-value storage
//!
//! Stores each key as a JSON file in the user's data directory.

use super::{KeyValueStore, StorageResult};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Local filesystem key-value storage
///
/// Values are stored as one file per key under the base path, which callers
/// resolve from configuration (`~/.stash/store` by default).
pub struct LocalKeyValueStore {
    /// Base directory for value files
    base_path: PathBuf,
}

impl LocalKeyValueStore {
    /// Create storage rooted at `base_path`
    pub fn with_path(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Base directory of this store
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    /// Ensure storage directory exists
    async fn ensure_dir(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    /// Get file path for a key
    fn value_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueStore for LocalKeyValueStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.value_path(key);

        match fs::read_to_string(&path).await {
            Ok(content) => {
                debug!("Read key {} from {:?}", key, path);
                Ok(Some(content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.ensure_dir().await?;

        // Write to a sibling file first so a crash never leaves a torn value
        let path = self.value_path(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).await?;
        fs::rename(&tmp_path, &path).await?;
        debug!("Wrote key {} to {:?}", key, path);

        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.value_path(key);

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed key {} at {:?}", key, path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
