//! Session management and profile persistence for Stash
//!
//! This crate provides:
//! - The user profile record and partial updates
//! - A key-value persistence contract with local file and in-memory backends
//! - The session manager that owns "current user" for the process lifetime

pub mod manager;
pub mod profile;
pub mod storage;

pub use manager::{SessionError, SessionManager, SessionResult, SessionState};
pub use profile::{ProfilePatch, UserId, UserProfile};
pub use storage::{
    KeyValueStore, LocalKeyValueStore, MemoryKeyValueStore, PROFILE_KEY, ProfileStore,
    StorageError, StorageResult,
};
