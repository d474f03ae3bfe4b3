//! Profile storage abstraction and implementations
//!
//! Persistence mechanics are a plain get/set/remove key-value contract.
//! `ProfileStore` keeps one serialized `UserProfile` under a well-known key.

mod local;
mod memory;

pub use local::LocalKeyValueStore;
pub use memory::MemoryKeyValueStore;

use crate::UserProfile;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Key under which the authenticated user's profile is stored
pub const PROFILE_KEY: &str = "user_profile";

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a key; removing an absent key succeeds
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Persisted profile store on top of a key-value backend
#[derive(Clone)]
pub struct ProfileStore {
    backend: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Load the stored profile, `None` when no session was persisted
    pub async fn load(&self) -> StorageResult<Option<UserProfile>> {
        let Some(content) = self.backend.get(PROFILE_KEY).await? else {
            debug!("No persisted profile found");
            return Ok(None);
        };

        let profile: UserProfile = serde_json::from_str(&content)?;
        debug!("Loaded persisted profile for user {}", profile.id);
        Ok(Some(profile))
    }

    /// Persist the profile
    pub async fn save(&self, profile: &UserProfile) -> StorageResult<()> {
        let content = serde_json::to_string(profile)?;
        self.backend.set(PROFILE_KEY, &content).await?;
        debug!("Persisted profile for user {}", profile.id);
        Ok(())
    }

    /// Remove the persisted profile
    pub async fn clear(&self) -> StorageResult<()> {
        self.backend.remove(PROFILE_KEY).await?;
        debug!("Cleared persisted profile");
        Ok(())
    }
}
