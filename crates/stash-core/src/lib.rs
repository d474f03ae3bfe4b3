//! Saved-article synchronization core for Stash
//!
//! Keeps a user's saved-article relations and their count consistent between
//! the session, per-article caches and the remote authority:
//! - `relation`: per-observer cache of one (user, article) relation
//! - `toggle`: optimistic save/remove with rollback and per-pair exclusion
//! - `list`: saved-list snapshot with removal reconciliation
//! - `remote`: the remote service contract and its HTTP/in-memory backends

pub mod config;
mod count;
pub mod error;
pub mod events;
pub mod list;
pub mod relation;
pub mod remote;
pub mod toggle;
pub mod types;

pub use config::{ConfigError, LoggingConfig, RemoteConfig, StashConfig, StorageConfig, SyncConfig};
pub use error::{StashError, StashResult};
pub use events::{EventBus, FilteredSubscriber, SyncEvent};
pub use list::{RemovalOutcome, SavedListReconciler, SavedListSnapshot};
pub use relation::{RelationCache, RelationRegistry};
pub use remote::{
    ArticleSummary, HttpSavedArticlesService, InMemorySavedArticles, RemoteCall, RemoteError,
    RemoteOperation, RemoteResult, SavedArticleSummary, SavedArticlesPage, SavedArticlesService,
};
pub use toggle::{ToggleCoordinator, ToggleOutcome};
pub use types::{ArticleId, RelationKey, SaveAction, SavedStatus};

pub use stash_session::{ProfilePatch, SessionManager, SessionState, UserId, UserProfile};
