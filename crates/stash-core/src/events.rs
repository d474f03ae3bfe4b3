//! Sync event bus
//!
//! Broadcast-based distribution of domain events so that UI surfaces can react
//! to mutations made elsewhere without holding references to each other.

use crate::types::{ArticleId, SaveAction};
use stash_session::UserId;
use tokio::sync::broadcast;

/// Events published by the sync core
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// A save was confirmed by the remote
    ArticleSaved {
        user_id: UserId,
        article_id: ArticleId,
        message: String,
    },

    /// A removal was confirmed by the remote
    ArticleRemoved {
        user_id: UserId,
        article_id: ArticleId,
        message: String,
    },

    /// A toggle was rolled back
    ToggleFailed {
        user_id: UserId,
        article_id: ArticleId,
        message: String,
    },

    /// The session's saved count changed
    SavedCountUpdated { user_id: UserId, count: u64 },

    /// The saved list snapshot was replaced
    SavedListRefreshed { user_id: UserId, count: u64 },

    /// Someone signed in or out
    SessionChanged { user_id: Option<UserId> },
}

impl SyncEvent {
    /// Build the event for a confirmed toggle
    pub fn confirmed(
        action: SaveAction,
        user_id: UserId,
        article_id: ArticleId,
        message: String,
    ) -> Self {
        match action {
            SaveAction::Saved => Self::ArticleSaved {
                user_id,
                article_id,
                message,
            },
            SaveAction::Removed => Self::ArticleRemoved {
                user_id,
                article_id,
                message,
            },
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ArticleSaved { .. } => "article_saved",
            Self::ArticleRemoved { .. } => "article_removed",
            Self::ToggleFailed { .. } => "toggle_failed",
            Self::SavedCountUpdated { .. } => "saved_count_updated",
            Self::SavedListRefreshed { .. } => "saved_list_refreshed",
            Self::SessionChanged { .. } => "session_changed",
        }
    }
}

/// Event bus for sync events
///
/// Each subscriber receives a copy of every event published after it
/// subscribed. Slow subscribers lose the oldest events once `capacity` is
/// exceeded.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of receivers, 0 if nobody listens.
    pub fn publish(&self, event: SyncEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    /// Create a default event bus with capacity of 256 events
    fn default() -> Self {
        Self::new(256)
    }
}

/// Subscriber that only yields selected event types
pub struct FilteredSubscriber {
    receiver: broadcast::Receiver<SyncEvent>,
    types: Vec<&'static str>,
}

impl FilteredSubscriber {
    pub fn new(bus: &EventBus, types: Vec<&'static str>) -> Self {
        Self {
            receiver: bus.subscribe(),
            types,
        }
    }

    /// Receive the next matching event
    pub async fn recv(&mut self) -> Result<SyncEvent, broadcast::error::RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.types.contains(&event.event_type()) {
                return Ok(event);
            }
        }
    }
}
