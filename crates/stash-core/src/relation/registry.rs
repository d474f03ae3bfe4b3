//! Shared relation caches keyed by (user, article)

use super::RelationCache;
use crate::remote::SavedArticlesService;
use crate::types::{ArticleId, RelationKey};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use stash_session::SessionManager;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Hands out one `RelationCache` per pair while any observer holds it
///
/// Entries are weak: when the last observer drops its `Arc`, the next
/// `observe` of that pair starts from a fresh cache.
pub struct RelationRegistry {
    service: Arc<dyn SavedArticlesService>,
    entries: DashMap<RelationKey, Weak<RelationCache>>,
}

impl RelationRegistry {
    pub fn new(service: Arc<dyn SavedArticlesService>) -> Self {
        Self {
            service,
            entries: DashMap::new(),
        }
    }

    /// Cache for the session's current user and `article_id`
    ///
    /// Without a user or article the cache is detached and never shared.
    pub fn observe(
        &self,
        session: &SessionManager,
        article_id: Option<ArticleId>,
    ) -> Arc<RelationCache> {
        let cache = RelationCache::observe(session, self.service.clone(), article_id);
        let Some(key) = cache.key() else {
            return Arc::new(cache);
        };

        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                if let Some(existing) = entry.get().upgrade().filter(|c| !c.is_closed()) {
                    return existing;
                }
                debug!("Replacing released relation cache for {}", entry.key());
                let cache = Arc::new(cache);
                entry.insert(Arc::downgrade(&cache));
                cache
            }
            Entry::Vacant(entry) => {
                let cache = Arc::new(cache);
                entry.insert(Arc::downgrade(&cache));
                cache
            }
        }
    }

    /// Drop entries whose observers are gone
    pub fn prune(&self) {
        self.entries
            .retain(|_, cache| cache.upgrade().is_some_and(|c| !c.is_closed()));
    }

    /// Number of pairs with a live observer
    pub fn live_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }
}
