//! Saved-relation cache
//!
//! A `RelationCache` is one observer's view of whether a user has saved an
//! article. Observers of the same pair do not share state unless they obtain
//! their cache from a [`RelationRegistry`].

mod registry;

pub use registry::RelationRegistry;

use crate::error::StashResult;
use crate::remote::SavedArticlesService;
use crate::types::{ArticleId, RelationKey, SavedStatus};
use parking_lot::Mutex;
use stash_session::{SessionManager, UserId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct RelationState {
    /// Last confirmed or intended status; never `Checking`
    settled: SavedStatus,
    checks_in_flight: u32,
    toggling: bool,
    /// Bumped on every optimistic write so stale checks can be discarded
    version: u64,
}

/// Counts a check as in flight until dropped
struct CheckGuard<'a> {
    state: &'a Mutex<RelationState>,
}

impl<'a> CheckGuard<'a> {
    fn enter(state: &'a Mutex<RelationState>) -> (Self, u64) {
        let mut locked = state.lock();
        locked.checks_in_flight += 1;
        let version = locked.version;
        drop(locked);
        (Self { state }, version)
    }
}

impl Drop for CheckGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.checks_in_flight = state.checks_in_flight.saturating_sub(1);
    }
}

/// Cached saved-state of one (user, article) observation
pub struct RelationCache {
    user_id: Option<UserId>,
    article_id: Option<ArticleId>,
    service: Arc<dyn SavedArticlesService>,
    state: Mutex<RelationState>,
    closed: CancellationToken,
}

impl RelationCache {
    /// Create a cache for an explicit pair
    pub fn new(
        user_id: Option<UserId>,
        article_id: Option<ArticleId>,
        service: Arc<dyn SavedArticlesService>,
    ) -> Self {
        Self {
            user_id,
            article_id,
            service,
            state: Mutex::new(RelationState::default()),
            closed: CancellationToken::new(),
        }
    }

    /// Create a cache for the session's current user
    pub fn observe(
        session: &SessionManager,
        service: Arc<dyn SavedArticlesService>,
        article_id: Option<ArticleId>,
    ) -> Self {
        Self::new(session.current_user_id(), article_id, service)
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn article_id(&self) -> Option<&ArticleId> {
        self.article_id.as_ref()
    }

    /// The observed pair, `None` if either identifier is absent
    pub fn key(&self) -> Option<RelationKey> {
        match (&self.user_id, &self.article_id) {
            (Some(user_id), Some(article_id)) => Some(RelationKey {
                user_id: user_id.clone(),
                article_id: article_id.clone(),
            }),
            _ => None,
        }
    }

    /// Current status
    ///
    /// Without a user or article this is always `NotSaved`. `Checking` is
    /// only reported while the first check is in flight; later checks keep
    /// showing the previous value.
    pub fn status(&self) -> SavedStatus {
        if self.key().is_none() {
            return SavedStatus::NotSaved;
        }
        let state = self.state.lock();
        if state.settled == SavedStatus::Unknown && state.checks_in_flight > 0 {
            SavedStatus::Checking
        } else {
            state.settled
        }
    }

    pub fn is_saved(&self) -> bool {
        self.status().is_saved()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().checks_in_flight > 0
    }

    pub fn is_toggling(&self) -> bool {
        self.state.lock().toggling
    }

    /// Tear the observer down; late results are ignored afterwards
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Re-check the relation against the remote
    ///
    /// On failure the previous status is kept and the error returned. A
    /// result that arrives after an optimistic write or after `close` is
    /// dropped. Dropping the returned future stops counting the check as
    /// loading.
    pub async fn refresh(&self) -> StashResult<SavedStatus> {
        let Some(key) = self.key() else {
            debug!("Relation check skipped: user or article absent");
            return Ok(SavedStatus::NotSaved);
        };
        if self.is_closed() {
            return Ok(self.status());
        }

        let (check, version) = CheckGuard::enter(&self.state);
        let result = self
            .service
            .check_saved(&key.user_id, &key.article_id)
            .await;
        drop(check);

        let mut state = self.state.lock();

        if self.closed.is_cancelled() {
            debug!("Discarding check result for closed relation {}", key);
            return Ok(state.settled);
        }

        match result {
            Ok(saved) => {
                if state.version == version {
                    state.settled = SavedStatus::from_saved(saved);
                } else {
                    debug!("Discarding stale check result for {}", key);
                }
                Ok(state.settled)
            }
            Err(e) => {
                warn!("Failed to check saved state of {}: {}", key, e);
                Err(e.into())
            }
        }
    }

    /// Apply `target` ahead of remote confirmation; returns the prior status
    pub(crate) fn apply_optimistic(&self, target: SavedStatus) -> SavedStatus {
        let mut state = self.state.lock();
        let previous = state.settled;
        state.settled = target;
        state.toggling = true;
        state.version += 1;
        previous
    }

    /// Finish a toggle with `status`, either the confirmed or the prior one
    pub(crate) fn settle(&self, status: SavedStatus) {
        if self.is_closed() {
            return;
        }
        let mut state = self.state.lock();
        state.settled = status;
        state.toggling = false;
        state.version += 1;
    }
}

impl std::fmt::Debug for RelationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationCache")
            .field("user_id", &self.user_id)
            .field("article_id", &self.article_id)
            .field("status", &self.status())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{
        InMemorySavedArticles, MockSavedArticlesService, RemoteError, RemoteOperation,
    };

    fn cache_with(
        remote: Arc<InMemorySavedArticles>,
        user: Option<&str>,
        article: Option<&str>,
    ) -> RelationCache {
        RelationCache::new(
            user.map(UserId::from),
            article.map(ArticleId::from),
            remote,
        )
    }

    #[tokio::test]
    async fn test_absent_user_resolves_not_saved_without_remote_call() {
        let remote = Arc::new(InMemorySavedArticles::new());
        let cache = cache_with(remote.clone(), None, Some("a-1"));

        assert_eq!(cache.refresh().await.unwrap(), SavedStatus::NotSaved);
        assert_eq!(cache.status(), SavedStatus::NotSaved);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_absent_article_resolves_not_saved() {
        let mut mock = MockSavedArticlesService::new();
        mock.expect_check_saved().never();

        let cache = RelationCache::new(Some(UserId::from("u-1")), None, Arc::new(mock));
        assert_eq!(cache.refresh().await.unwrap(), SavedStatus::NotSaved);
    }

    #[tokio::test]
    async fn test_refresh_reads_remote() {
        let remote = Arc::new(InMemorySavedArticles::new());
        remote.seed_saved("u-1", "a-1");
        let cache = cache_with(remote.clone(), Some("u-1"), Some("a-1"));

        assert_eq!(cache.status(), SavedStatus::Unknown);
        assert_eq!(cache.refresh().await.unwrap(), SavedStatus::Saved);
        assert!(cache.is_saved());
        assert!(!cache.is_loading());
    }

    #[tokio::test]
    async fn test_repeated_refresh_is_stable() {
        let remote = Arc::new(InMemorySavedArticles::new());
        remote.seed_saved("u-1", "a-1");
        let cache = cache_with(remote.clone(), Some("u-1"), Some("a-1"));

        for _ in 0..3 {
            assert_eq!(cache.refresh().await.unwrap(), SavedStatus::Saved);
        }
        assert_eq!(remote.call_count(RemoteOperation::CheckSaved), 3);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_status() {
        let remote = Arc::new(InMemorySavedArticles::new());
        remote.seed_saved("u-1", "a-1");
        let cache = cache_with(remote.clone(), Some("u-1"), Some("a-1"));
        cache.refresh().await.unwrap();

        remote.fail_next(
            RemoteOperation::CheckSaved,
            RemoteError::Transport("offline".into()),
        );
        assert!(cache.refresh().await.is_err());
        assert_eq!(cache.status(), SavedStatus::Saved);
    }

    #[tokio::test]
    async fn test_checking_reported_during_first_check() {
        let remote = Arc::new(InMemorySavedArticles::new());
        remote.pause(RemoteOperation::CheckSaved);
        let cache = Arc::new(cache_with(remote.clone(), Some("u-1"), Some("a-1")));

        let task = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.refresh().await })
        };
        remote.wait_for_calls(RemoteOperation::CheckSaved, 1).await;
        assert_eq!(cache.status(), SavedStatus::Checking);
        assert!(cache.is_loading());

        remote.resume();
        assert_eq!(task.await.unwrap().unwrap(), SavedStatus::NotSaved);
    }

    #[tokio::test]
    async fn test_dropped_check_stops_loading() {
        let remote = Arc::new(InMemorySavedArticles::new());
        remote.pause(RemoteOperation::CheckSaved);
        let cache = cache_with(remote.clone(), Some("u-1"), Some("a-1"));

        tokio::select! {
            _ = cache.refresh() => panic!("check should be held"),
            _ = remote.wait_for_calls(RemoteOperation::CheckSaved, 1) => {}
        }
        remote.resume();

        assert!(!cache.is_loading());
        assert_eq!(cache.status(), SavedStatus::Unknown);
    }

    #[tokio::test]
    async fn test_result_after_close_is_discarded() {
        let remote = Arc::new(InMemorySavedArticles::new());
        remote.seed_saved("u-1", "a-1");
        remote.pause(RemoteOperation::CheckSaved);
        let cache = Arc::new(cache_with(remote.clone(), Some("u-1"), Some("a-1")));

        let task = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.refresh().await })
        };
        remote.wait_for_calls(RemoteOperation::CheckSaved, 1).await;
        cache.close();
        remote.resume();

        task.await.unwrap().unwrap();
        assert_eq!(cache.status(), SavedStatus::Unknown);
    }

    #[tokio::test]
    async fn test_check_overtaken_by_optimistic_write_is_dropped() {
        let remote = Arc::new(InMemorySavedArticles::new());
        remote.pause(RemoteOperation::CheckSaved);
        let cache = Arc::new(cache_with(remote.clone(), Some("u-1"), Some("a-1")));

        let task = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.refresh().await })
        };
        remote.wait_for_calls(RemoteOperation::CheckSaved, 1).await;
        cache.apply_optimistic(SavedStatus::Saved);
        remote.resume();

        assert_eq!(task.await.unwrap().unwrap(), SavedStatus::Saved);
        assert!(cache.is_toggling());
    }
}
