//! Saved-list reconciliation
//!
//! Owns the snapshot of the user's saved articles. A full refresh replaces
//! the snapshot and takes the count from the same response. A single removal
//! drops the entry and decrements the count locally for immediate feedback,
//! then re-reads the count from the remote to correct any drift.

use crate::config::SyncConfig;
use crate::count::{publish_saved_count, refresh_saved_count};
use crate::error::{StashError, StashResult};
use crate::events::{EventBus, SyncEvent};
use crate::remote::{SavedArticleSummary, SavedArticlesService};
use crate::types::ArticleId;
use parking_lot::Mutex;
use stash_session::{SessionManager, UserId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The saved list as currently displayed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedListSnapshot {
    pub articles: Vec<SavedArticleSummary>,
    pub count: u64,
    /// Whether a refresh has completed at least once
    pub loaded: bool,
}

impl SavedListSnapshot {
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn contains(&self, article_id: &ArticleId) -> bool {
        self.articles.iter().any(|a| &a.article_id == article_id)
    }
}

/// Result of a successful single removal
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalOutcome {
    pub message: String,
    /// Displayed count after the removal
    pub count: u64,
}

#[derive(Debug, Default)]
struct ListState {
    snapshot: SavedListSnapshot,
    refreshes_in_flight: u32,
    /// Bumped by every refresh request and every applied removal
    issued: u64,
    /// Generation the snapshot currently reflects
    applied: u64,
}

/// Counts a refresh as loading until dropped
struct LoadingGuard<'a> {
    state: &'a Mutex<ListState>,
}

impl<'a> LoadingGuard<'a> {
    fn enter(state: &'a Mutex<ListState>) -> (Self, u64) {
        let mut locked = state.lock();
        locked.issued += 1;
        locked.refreshes_in_flight += 1;
        let generation = locked.issued;
        drop(locked);
        (Self { state }, generation)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.refreshes_in_flight = state.refreshes_in_flight.saturating_sub(1);
    }
}

/// Maintains the saved-article list view
pub struct SavedListReconciler {
    session: Arc<SessionManager>,
    service: Arc<dyn SavedArticlesService>,
    events: EventBus,
    config: SyncConfig,
    state: Mutex<ListState>,
    closed: CancellationToken,
}

impl SavedListReconciler {
    pub fn new(session: Arc<SessionManager>, service: Arc<dyn SavedArticlesService>) -> Self {
        Self {
            session,
            service,
            events: EventBus::default(),
            config: SyncConfig::default(),
            state: Mutex::new(ListState::default()),
            closed: CancellationToken::new(),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn snapshot(&self) -> SavedListSnapshot {
        self.state.lock().snapshot.clone()
    }

    /// Displayed count
    pub fn count(&self) -> u64 {
        self.state.lock().snapshot.count
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().refreshes_in_flight > 0
    }

    /// Tear the list view down; late responses are ignored afterwards
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn ensure_signed_in(&self, user_id: &UserId) -> StashResult<()> {
        if user_id.as_str().is_empty() || self.session.current_user_id().as_ref() != Some(user_id)
        {
            return Err(StashError::not_signed_in());
        }
        Ok(())
    }

    /// Replace the snapshot with the remote's list and count
    ///
    /// When refreshes overlap, a response is applied only if no newer refresh
    /// has been applied yet; a failed refresh never blocks an older one that
    /// succeeds. A removal supersedes every refresh issued before it.
    pub async fn refresh(&self, user_id: &UserId) -> StashResult<SavedListSnapshot> {
        self.ensure_signed_in(user_id)?;

        let (loading, generation) = LoadingGuard::enter(&self.state);
        let result = self.service.get_user_saved_articles(user_id).await;
        drop(loading);

        if self.is_closed() {
            debug!("Discarding saved list for {}: view closed", user_id);
            return Ok(self.snapshot());
        }

        let page = result.map_err(|e| {
            warn!("Failed to load saved list for {}: {}", user_id, e);
            StashError::from(e)
        })?;

        let snapshot = {
            let mut state = self.state.lock();
            if generation <= state.applied {
                debug!("Discarding superseded saved list for {}", user_id);
                return Ok(state.snapshot.clone());
            }
            state.applied = generation;
            state.snapshot = SavedListSnapshot {
                articles: page.articles,
                count: page.count,
                loaded: true,
            };
            state.snapshot.clone()
        };

        debug!(
            "Saved list for {} refreshed: {} entries, count {}",
            user_id,
            snapshot.len(),
            snapshot.count
        );
        self.events.publish(SyncEvent::SavedListRefreshed {
            user_id: user_id.clone(),
            count: snapshot.count,
        });
        publish_saved_count(&self.session, &self.events, user_id, snapshot.count).await;

        Ok(snapshot)
    }

    /// Remove one article from the saved list
    ///
    /// On remote failure the snapshot and count are left as they were. The
    /// count is decremented locally only when the loaded list contained the
    /// article; otherwise the displayed and session counts keep their value
    /// until the remote re-read, or the next refresh when that is disabled.
    pub async fn remove_one(
        &self,
        user_id: &UserId,
        article_id: &ArticleId,
    ) -> StashResult<RemovalOutcome> {
        self.ensure_signed_in(user_id)?;

        let message = self
            .service
            .remove(user_id, article_id)
            .await
            .map_err(|e| {
                warn!("Failed to remove {} for {}: {}", article_id, user_id, e);
                StashError::from(e)
            })?;

        if self.is_closed() {
            debug!("Removal of {} confirmed after view closed", article_id);
            return Ok(RemovalOutcome {
                message,
                count: self.count(),
            });
        }

        let estimate = {
            let mut state = self.state.lock();
            state.issued += 1;
            state.applied = state.issued;
            let before = state.snapshot.articles.len();
            state
                .snapshot
                .articles
                .retain(|a| &a.article_id != article_id);
            if state.snapshot.loaded && state.snapshot.articles.len() < before {
                state.snapshot.count = state.snapshot.count.saturating_sub(1);
                Some(state.snapshot.count)
            } else {
                None
            }
        };

        info!("Removed {} from saved list of {}", article_id, user_id);
        self.events.publish(SyncEvent::ArticleRemoved {
            user_id: user_id.clone(),
            article_id: article_id.clone(),
            message: message.clone(),
        });

        if let Some(estimate) = estimate {
            publish_saved_count(&self.session, &self.events, user_id, estimate).await;
        }

        if self.config.reconcile_count_after_removal {
            if let Some(fresh) =
                refresh_saved_count(&self.session, self.service.as_ref(), &self.events, user_id)
                    .await
            {
                if !self.is_closed() {
                    self.state.lock().snapshot.count = fresh;
                }
            }
        }

        Ok(RemovalOutcome {
            message,
            count: self.count(),
        })
    }
}
