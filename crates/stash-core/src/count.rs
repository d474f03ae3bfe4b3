//! Saved-count follow-up shared by the coordinators

use crate::events::{EventBus, SyncEvent};
use crate::remote::SavedArticlesService;
use stash_session::{ProfilePatch, SessionManager, UserId};
use tracing::{debug, warn};

/// Store a remote-sourced count on the session and announce it
///
/// Skipped when `user_id` is no longer signed in. Failures are logged only.
pub(crate) async fn publish_saved_count(
    session: &SessionManager,
    events: &EventBus,
    user_id: &UserId,
    count: u64,
) -> Option<u64> {
    match session
        .patch_for(user_id, ProfilePatch::saved_articles_count(count))
        .await
    {
        Ok(Some(_)) => {
            events.publish(SyncEvent::SavedCountUpdated {
                user_id: user_id.clone(),
                count,
            });
            Some(count)
        }
        Ok(None) => {
            debug!("Saved count for {} dropped: user no longer signed in", user_id);
            None
        }
        Err(e) => {
            warn!("Failed to store saved count for {}: {}", user_id, e);
            None
        }
    }
}

/// Re-read the saved count from the remote and store it on the session
///
/// Best effort: a failed read leaves the previous count in place.
pub(crate) async fn refresh_saved_count(
    session: &SessionManager,
    service: &dyn SavedArticlesService,
    events: &EventBus,
    user_id: &UserId,
) -> Option<u64> {
    match service.get_user_saved_count(user_id).await {
        Ok(count) => publish_saved_count(session, events, user_id, count).await,
        Err(e) => {
            warn!("Failed to refresh saved count for {}, keeping stale value: {}", user_id, e);
            None
        }
    }
}
