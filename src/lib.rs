//! Stash: saved-article state synchronization
//!
//! Wires the session manager, relation caches, toggle coordinator and saved
//! list reconciler around one remote service and one event bus.
//!
//! # Example
//!
//! ```no_run
//! use stash::{ArticleId, Stash, StashConfig, UserProfile};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stash = Stash::open(StashConfig::default()).await?;
//! stash
//!     .sign_in(UserProfile::new("u-1", "Ada", "ada@example.com"))
//!     .await?;
//!
//! let relation = stash.observe(ArticleId::from("a-42"));
//! relation.refresh().await?;
//! let outcome = stash.toggles().toggle(&relation).await;
//! println!("{:?}", outcome.message());
//! # Ok(())
//! # }
//! ```

use stash_session::ProfileStore;
use std::sync::Arc;
use tracing::info;

pub use stash_core::*;
pub use stash_session::{
    KeyValueStore, LocalKeyValueStore, MemoryKeyValueStore, SessionError, StorageError,
};

/// Assembled sync core sharing one session, remote and event bus
pub struct Stash {
    config: StashConfig,
    session: Arc<SessionManager>,
    service: Arc<dyn SavedArticlesService>,
    events: EventBus,
    toggles: ToggleCoordinator,
    saved_list: SavedListReconciler,
    relations: RelationRegistry,
}

impl Stash {
    /// Open with the local file store and the HTTP remote from `config`
    pub async fn open(config: StashConfig) -> Result<Self, ConfigError> {
        let data_dir = config
            .storage
            .resolved_data_dir()
            .ok_or_else(|| ConfigError::Invalid {
                key: "storage.data_dir".to_string(),
                message: "no home directory; set a data directory explicitly".to_string(),
            })?;
        let store: Arc<dyn KeyValueStore> = Arc::new(LocalKeyValueStore::with_path(data_dir));
        let service: Arc<dyn SavedArticlesService> =
            Arc::new(HttpSavedArticlesService::new(&config.remote)?);

        Ok(Self::with_backends(config, store, service).await)
    }

    /// Assemble around explicit backends and hydrate the session
    pub async fn with_backends(
        config: StashConfig,
        store: Arc<dyn KeyValueStore>,
        service: Arc<dyn SavedArticlesService>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(ProfileStore::new(store)));
        let events = EventBus::new(config.sync.event_capacity);

        let toggles = ToggleCoordinator::new(session.clone(), service.clone())
            .with_events(events.clone())
            .with_config(config.sync.clone());
        let saved_list = SavedListReconciler::new(session.clone(), service.clone())
            .with_events(events.clone())
            .with_config(config.sync.clone());
        let relations = RelationRegistry::new(service.clone());

        let state = session.initialize().await;
        info!("Stash ready, session {}", state.name());

        Self {
            config,
            session,
            service,
            events,
            toggles,
            saved_list,
            relations,
        }
    }

    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn service(&self) -> &Arc<dyn SavedArticlesService> {
        &self.service
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn toggles(&self) -> &ToggleCoordinator {
        &self.toggles
    }

    pub fn saved_list(&self) -> &SavedListReconciler {
        &self.saved_list
    }

    /// Shared relation cache for the current user and `article_id`
    pub fn observe(&self, article_id: ArticleId) -> Arc<RelationCache> {
        self.relations.observe(&self.session, Some(article_id))
    }

    /// Relation cache owned by a single observer
    pub fn observe_detached(&self, article_id: ArticleId) -> RelationCache {
        RelationCache::observe(&self.session, self.service.clone(), Some(article_id))
    }

    /// Sign a user in and pull their saved count
    pub async fn sign_in(&self, profile: UserProfile) -> StashResult<UserProfile> {
        let user_id = profile.id.clone();
        self.session.authenticate(profile).await?;
        self.events.publish(SyncEvent::SessionChanged {
            user_id: Some(user_id.clone()),
        });

        self.toggles.refresh_saved_count(&user_id).await;
        self.session
            .current_profile()
            .ok_or_else(StashError::not_signed_in)
    }

    /// Sign out; the in-memory session is cleared even if the store fails
    pub async fn sign_out(&self) -> StashResult<()> {
        let result = self.session.logout().await;
        self.relations.prune();
        self.events.publish(SyncEvent::SessionChanged { user_id: None });
        result.map_err(StashError::from)
    }
}
