//! Toggle coordination
//!
//! A toggle is a three-phase protocol: apply the intended state to the
//! relation cache, await the remote, then commit or revert. At most one
//! toggle per (user, article) pair is in flight; the guard that enforces this
//! also reverts the cache if the toggle future is dropped before settling.

use crate::config::SyncConfig;
use crate::count::refresh_saved_count;
use crate::error::StashError;
use crate::events::{EventBus, SyncEvent};
use crate::relation::RelationCache;
use crate::remote::SavedArticlesService;
use crate::types::{RelationKey, SaveAction, SavedStatus};
use dashmap::DashSet;
use stash_session::{SessionManager, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a toggle
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// The remote confirmed the change
    Completed {
        action: SaveAction,
        message: String,
        status: SavedStatus,
    },
    /// Another toggle for the pair is in flight, or the observer is closed
    Skipped { status: SavedStatus },
    /// Nothing changed; the cache was reverted if it had been touched
    Failed {
        error: StashError,
        status: SavedStatus,
    },
}

impl ToggleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Status of the relation after the toggle
    pub fn status(&self) -> SavedStatus {
        match self {
            Self::Completed { status, .. }
            | Self::Skipped { status }
            | Self::Failed { status, .. } => *status,
        }
    }

    pub fn action(&self) -> Option<SaveAction> {
        match self {
            Self::Completed { action, .. } => Some(*action),
            _ => None,
        }
    }

    /// Message fit for direct display, if there is one
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Completed { message, .. } => Some(message.clone()),
            Self::Skipped { .. } => None,
            Self::Failed { error, .. } => Some(error.user_message()),
        }
    }
}

/// Marks a pair as in flight and restores the relation if never settled
struct InFlightGuard<'a> {
    in_flight: &'a DashSet<RelationKey>,
    key: RelationKey,
    relation: &'a RelationCache,
    previous: SavedStatus,
    settled: bool,
}

impl InFlightGuard<'_> {
    fn settle(&mut self, status: SavedStatus) {
        self.relation.settle(status);
        self.settled = true;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!("Toggle for {} abandoned, reverting", self.key);
            self.relation.settle(self.previous);
        }
        self.in_flight.remove(&self.key);
    }
}

fn default_message(action: SaveAction) -> &'static str {
    match action {
        SaveAction::Saved => "Article saved",
        SaveAction::Removed => "Article removed from saved",
    }
}

/// Orchestrates optimistic save/remove of single relations
pub struct ToggleCoordinator {
    session: Arc<SessionManager>,
    service: Arc<dyn SavedArticlesService>,
    events: EventBus,
    config: SyncConfig,
    in_flight: DashSet<RelationKey>,
}

impl ToggleCoordinator {
    pub fn new(session: Arc<SessionManager>, service: Arc<dyn SavedArticlesService>) -> Self {
        Self {
            session,
            service,
            events: EventBus::default(),
            config: SyncConfig::default(),
            in_flight: DashSet::new(),
        }
    }

    /// Publish domain events on `events`
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Whether a toggle for `key` is currently in flight
    pub fn is_in_flight(&self, key: &RelationKey) -> bool {
        self.in_flight.contains(key)
    }

    /// Re-read the user's saved count and store it on the session
    ///
    /// Best effort; returns the stored count, `None` if nothing was stored.
    pub async fn refresh_saved_count(&self, user_id: &UserId) -> Option<u64> {
        refresh_saved_count(&self.session, self.service.as_ref(), &self.events, user_id).await
    }

    /// Flip the saved state of the relation observed by `relation`
    pub async fn toggle(&self, relation: &RelationCache) -> ToggleOutcome {
        let Some(key) = relation.key() else {
            let error = if relation.user_id().is_none() {
                StashError::not_signed_in()
            } else {
                StashError::precondition("No article selected.")
            };
            return ToggleOutcome::Failed {
                error,
                status: relation.status(),
            };
        };

        if self.session.current_user_id().as_ref() != Some(&key.user_id) {
            debug!("Toggle for {} refused: user is no longer signed in", key);
            return ToggleOutcome::Failed {
                error: StashError::not_signed_in(),
                status: relation.status(),
            };
        }

        if relation.is_closed() {
            return ToggleOutcome::Skipped {
                status: relation.status(),
            };
        }

        if !self.in_flight.insert(key.clone()) {
            debug!("Toggle for {} already in flight", key);
            return ToggleOutcome::Skipped {
                status: relation.status(),
            };
        }

        // Phase 1: apply the intended state
        let previous = relation.apply_optimistic(relation.status().toggled());
        let mut guard = InFlightGuard {
            in_flight: &self.in_flight,
            key: key.clone(),
            relation,
            previous,
            settled: false,
        };
        let (action, target) = if previous.is_saved() {
            (SaveAction::Removed, SavedStatus::NotSaved)
        } else {
            (SaveAction::Saved, SavedStatus::Saved)
        };

        // Phase 2: await the remote
        let result = match action {
            SaveAction::Saved => self.service.save(&key.user_id, &key.article_id).await,
            SaveAction::Removed => self.service.remove(&key.user_id, &key.article_id).await,
        };

        // Phase 3: commit or revert
        match result {
            Ok(message) => {
                // The pair stays in flight until the count follow-up is done
                guard.settle(target);

                let message = Some(message)
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| default_message(action).to_string());
                info!("Article {} for {}", action, key);
                self.events.publish(SyncEvent::confirmed(
                    action,
                    key.user_id.clone(),
                    key.article_id.clone(),
                    message.clone(),
                ));

                if self.config.refresh_count_after_toggle {
                    refresh_saved_count(
                        &self.session,
                        self.service.as_ref(),
                        &self.events,
                        &key.user_id,
                    )
                    .await;
                }
                drop(guard);

                ToggleOutcome::Completed {
                    action,
                    message,
                    status: target,
                }
            }
            Err(e) => {
                guard.settle(previous);
                drop(guard);

                let error = StashError::from(e);
                warn!("Toggle for {} rolled back: {}", key, error);
                self.events.publish(SyncEvent::ToggleFailed {
                    user_id: key.user_id.clone(),
                    article_id: key.article_id.clone(),
                    message: error.user_message(),
                });

                ToggleOutcome::Failed {
                    error,
                    status: previous,
                }
            }
        }
    }
}
