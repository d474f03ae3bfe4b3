//! Session manager
//!
//! In-memory projection of the persisted profile. Every mutation is
//! write-through: the profile store is updated first and only then is the new
//! state published to observers.

use crate::storage::{ProfileStore, StorageError};
use crate::{ProfilePatch, UserId, UserProfile};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

/// Session operation errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation requires an authenticated user
    #[error("No authenticated user")]
    NotAuthenticated,

    #[error("Profile storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Lifecycle state of the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// `initialize` has not run yet
    Uninitialized,
    /// Hydrating from the profile store
    Loading,
    /// A user is signed in
    Authenticated(UserProfile),
    /// Nobody is signed in
    Unauthenticated,
}

impl SessionState {
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.profile().map(|p| &p.id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Short state name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Authenticated(_) => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

/// Owner of the current user's profile for the lifetime of the process
///
/// Share it behind an `Arc`; observers call [`SessionManager::subscribe`] to
/// follow state transitions.
pub struct SessionManager {
    store: ProfileStore,
    state: watch::Sender<SessionState>,
    /// Serializes store-then-publish sequences
    write_lock: Mutex<()>,
}

impl SessionManager {
    /// Create a manager in the `Uninitialized` state
    pub fn new(store: ProfileStore) -> Self {
        let (state, _) = watch::channel(SessionState::Uninitialized);
        Self {
            store,
            state,
            write_lock: Mutex::new(()),
        }
    }

    /// Hydrate from the profile store
    ///
    /// A load failure is logged and treated like an absent profile.
    pub async fn initialize(&self) -> SessionState {
        let _guard = self.write_lock.lock().await;
        self.publish(SessionState::Loading);

        let next = match self.store.load().await {
            Ok(Some(profile)) => {
                info!("Restored session for user {}", profile.id);
                SessionState::Authenticated(profile)
            }
            Ok(None) => {
                debug!("No persisted session");
                SessionState::Unauthenticated
            }
            Err(e) => {
                warn!("Failed to load persisted profile, starting signed out: {}", e);
                SessionState::Unauthenticated
            }
        };

        self.publish(next.clone());
        next
    }

    /// Sign a user in, replacing any previous profile
    pub async fn authenticate(&self, profile: UserProfile) -> SessionResult<()> {
        let _guard = self.write_lock.lock().await;

        self.store.save(&profile).await?;
        info!("Authenticated user {}", profile.id);
        self.publish(SessionState::Authenticated(profile));

        Ok(())
    }

    /// Merge a partial update into the current profile
    ///
    /// Returns the merged profile after it has been persisted and published.
    pub async fn patch(&self, patch: ProfilePatch) -> SessionResult<UserProfile> {
        let _guard = self.write_lock.lock().await;

        let current = self.current_profile().ok_or(SessionError::NotAuthenticated)?;
        self.write_patch(current, &patch).await
    }

    /// Patch the profile only if `user_id` is still the signed-in user
    ///
    /// Returns `Ok(None)` when another user (or nobody) is signed in.
    pub async fn patch_for(
        &self,
        user_id: &UserId,
        patch: ProfilePatch,
    ) -> SessionResult<Option<UserProfile>> {
        let _guard = self.write_lock.lock().await;

        match self.current_profile() {
            Some(current) if &current.id == user_id => {
                self.write_patch(current, &patch).await.map(Some)
            }
            Some(_) => {
                debug!("Skipping patch for {}: a different user is signed in", user_id);
                Ok(None)
            }
            None => {
                debug!("Skipping patch for {}: nobody is signed in", user_id);
                Ok(None)
            }
        }
    }

    /// Sign out
    ///
    /// The in-memory session is cleared even when the durable clear fails; the
    /// storage error is still returned.
    pub async fn logout(&self) -> SessionResult<()> {
        let _guard = self.write_lock.lock().await;

        let result = self.store.clear().await;
        if let Some(user_id) = self.current_user_id() {
            info!("Logged out user {}", user_id);
        }
        self.publish(SessionState::Unauthenticated);

        if let Err(e) = &result {
            warn!("Failed to clear persisted profile on logout: {}", e);
        }
        result.map_err(SessionError::from)
    }

    /// Identifier of the signed-in user
    pub fn current_user_id(&self) -> Option<UserId> {
        self.state.borrow().user_id().cloned()
    }

    /// Snapshot of the signed-in user's profile
    pub fn current_profile(&self) -> Option<UserProfile> {
        self.state.borrow().profile().cloned()
    }

    /// Snapshot of the session state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Follow state transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    async fn write_patch(
        &self,
        mut profile: UserProfile,
        patch: &ProfilePatch,
    ) -> SessionResult<UserProfile> {
        profile.apply(patch);
        self.store.save(&profile).await?;
        self.publish(SessionState::Authenticated(profile.clone()));
        debug!("Patched profile for user {}", profile.id);
        Ok(profile)
    }

    fn publish(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        debug!(
            "Session state {} -> {}",
            previous.name(),
            self.state.borrow().name()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryKeyValueStore, PROFILE_KEY};
    use std::sync::Arc;

    fn manager() -> (SessionManager, Arc<MemoryKeyValueStore>) {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let manager = SessionManager::new(ProfileStore::new(backend.clone()));
        (manager, backend)
    }

    fn ada() -> UserProfile {
        UserProfile::new("u-1", "Ada", "ada@example.com")
    }

    #[tokio::test]
    async fn test_initialize_without_profile() {
        let (manager, _) = manager();
        assert_eq!(manager.state(), SessionState::Uninitialized);

        let state = manager.initialize().await;
        assert_eq!(state, SessionState::Unauthenticated);
        assert!(manager.current_user_id().is_none());
    }

    #[tokio::test]
    async fn test_initialize_restores_profile() {
        let (manager, backend) = manager();
        ProfileStore::new(backend.clone()).save(&ada()).await.unwrap();

        let state = manager.initialize().await;
        assert!(state.is_authenticated());
        assert_eq!(manager.current_user_id(), Some(UserId::from("u-1")));
    }

    #[tokio::test]
    async fn test_initialize_with_corrupt_profile_is_signed_out() {
        let (manager, backend) = manager();
        backend.set(PROFILE_KEY, "garbage").await.unwrap();

        assert_eq!(manager.initialize().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_initialize_twice_rehydrates() {
        let (manager, backend) = manager();
        manager.initialize().await;
        assert!(!manager.is_authenticated());

        ProfileStore::new(backend.clone()).save(&ada()).await.unwrap();
        assert!(manager.initialize().await.is_authenticated());
    }

    #[tokio::test]
    async fn test_authenticate_persists_then_publishes() {
        let (manager, backend) = manager();
        manager.initialize().await;

        manager.authenticate(ada()).await.unwrap();
        assert!(manager.is_authenticated());
        assert!(backend.get(PROFILE_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_authenticate_failure_leaves_state_untouched() {
        let (manager, backend) = manager();
        manager.initialize().await;
        backend.set_unavailable(true);

        let result = manager.authenticate(ada()).await;
        assert!(matches!(result, Err(SessionError::Storage(_))));
        assert_eq!(manager.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_patch_requires_authentication() {
        let (manager, _) = manager();
        manager.initialize().await;

        let result = manager.patch(ProfilePatch::saved_articles_count(2)).await;
        assert!(matches!(result, Err(SessionError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_patch_merges_and_persists() {
        let (manager, _) = manager();
        manager.authenticate(ada()).await.unwrap();

        let merged = manager
            .patch(ProfilePatch::saved_articles_count(5))
            .await
            .unwrap();
        assert_eq!(merged.saved_articles_count, 5);
        assert_eq!(merged.name, "Ada");

        // A fresh manager over the same store sees the write
        manager.initialize().await;
        assert_eq!(manager.current_profile().unwrap().saved_articles_count, 5);
    }

    #[tokio::test]
    async fn test_patch_storage_failure_does_not_publish() {
        let (manager, backend) = manager();
        manager.authenticate(ada()).await.unwrap();
        backend.set_unavailable(true);

        let result = manager.patch(ProfilePatch::saved_articles_count(9)).await;
        assert!(result.is_err());
        assert_eq!(manager.current_profile().unwrap().saved_articles_count, 0);
    }

    #[tokio::test]
    async fn test_patch_for_other_user_is_skipped() {
        let (manager, _) = manager();
        manager.authenticate(ada()).await.unwrap();

        let result = manager
            .patch_for(&UserId::from("u-2"), ProfilePatch::saved_articles_count(3))
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(manager.current_profile().unwrap().saved_articles_count, 0);

        let result = manager
            .patch_for(&UserId::from("u-1"), ProfilePatch::saved_articles_count(3))
            .await
            .unwrap();
        assert_eq!(result.unwrap().saved_articles_count, 3);
    }

    #[tokio::test]
    async fn test_logout_clears_memory_even_when_store_fails() {
        let (manager, backend) = manager();
        manager.authenticate(ada()).await.unwrap();
        backend.set_unavailable(true);

        let result = manager.logout().await;
        assert!(matches!(result, Err(SessionError::Storage(_))));
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert!(manager.current_user_id().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let (manager, _) = manager();
        let mut rx = manager.subscribe();

        manager.authenticate(ada()).await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_authenticated());

        manager.logout().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SessionState::Unauthenticated);
    }
}
