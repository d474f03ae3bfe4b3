//! In-process saved-articles service
//!
//! Holds relations in memory and records every call. Failures can be queued
//! per operation and individual operations can be paused, which makes it the
//! backing service for scenario tests and offline demos.

use super::{
    ArticleSummary, RemoteError, RemoteResult, SavedArticleSummary, SavedArticlesPage,
    SavedArticlesService,
};
use crate::types::ArticleId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use stash_session::UserId;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::Notify;

/// Remote operation names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    CheckSaved,
    Save,
    Remove,
    Count,
    List,
}

/// A recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub operation: RemoteOperation,
    pub user_id: UserId,
    pub article_id: Option<ArticleId>,
}

#[derive(Default)]
struct Inner {
    /// Saved entries per user, oldest first
    saved: HashMap<UserId, Vec<(ArticleId, DateTime<Utc>)>>,
    catalog: HashMap<ArticleId, ArticleSummary>,
    calls: Vec<RemoteCall>,
    failures: HashMap<RemoteOperation, VecDeque<RemoteError>>,
    count_offset: i64,
}

/// In-memory saved-articles service
#[derive(Default)]
pub struct InMemorySavedArticles {
    inner: Mutex<Inner>,
    paused: Mutex<HashSet<RemoteOperation>>,
    resumed: Notify,
    called: Notify,
}

impl InMemorySavedArticles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register display fields for an article
    pub fn with_article(self, article_id: impl Into<ArticleId>, summary: ArticleSummary) -> Self {
        self.inner.lock().catalog.insert(article_id.into(), summary);
        self
    }

    /// Mark an article as already saved, bypassing the call log
    pub fn seed_saved(&self, user_id: impl Into<UserId>, article_id: impl Into<ArticleId>) {
        let user_id = user_id.into();
        let article_id = article_id.into();
        let mut inner = self.inner.lock();
        let entries = inner.saved.entry(user_id).or_default();
        if !entries.iter().any(|(id, _)| id == &article_id) {
            entries.push((article_id, Utc::now()));
        }
    }

    /// Make the next call of `operation` fail with `error`
    pub fn fail_next(&self, operation: RemoteOperation, error: RemoteError) {
        self.inner
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Skew reported counts by `offset`, to model a remote whose count lags
    pub fn set_count_offset(&self, offset: i64) {
        self.inner.lock().count_offset = offset;
    }

    /// Hold calls of `operation` until [`resume`](Self::resume)
    pub fn pause(&self, operation: RemoteOperation) {
        self.paused.lock().insert(operation);
    }

    /// Release every held call
    pub fn resume(&self) {
        self.paused.lock().clear();
        self.resumed.notify_waiters();
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of recorded calls of `operation`
    pub fn call_count(&self, operation: RemoteOperation) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Wait until at least `n` calls of `operation` were recorded
    pub async fn wait_for_calls(&self, operation: RemoteOperation, n: usize) {
        loop {
            let called = self.called.notified();
            if self.call_count(operation) >= n {
                return;
            }
            called.await;
        }
    }

    /// Whether the relation currently exists
    pub fn is_saved(&self, user_id: &UserId, article_id: &ArticleId) -> bool {
        self.inner
            .lock()
            .saved
            .get(user_id)
            .is_some_and(|entries| entries.iter().any(|(id, _)| id == article_id))
    }

    /// Record the call, apply pauses and queued failures
    async fn enter(
        &self,
        operation: RemoteOperation,
        user_id: &UserId,
        article_id: Option<&ArticleId>,
    ) -> RemoteResult<()> {
        self.inner.lock().calls.push(RemoteCall {
            operation,
            user_id: user_id.clone(),
            article_id: article_id.cloned(),
        });
        self.called.notify_waiters();

        loop {
            let resumed = self.resumed.notified();
            if !self.paused.lock().contains(&operation) {
                break;
            }
            resumed.await;
        }

        match self
            .inner
            .lock()
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn count_for(inner: &Inner, user_id: &UserId) -> u64 {
        let actual = inner.saved.get(user_id).map_or(0, Vec::len) as i64;
        (actual + inner.count_offset).max(0) as u64
    }
}

#[async_trait]
impl SavedArticlesService for InMemorySavedArticles {
    async fn check_saved(&self, user_id: &UserId, article_id: &ArticleId) -> RemoteResult<bool> {
        self.enter(RemoteOperation::CheckSaved, user_id, Some(article_id))
            .await?;
        Ok(self.is_saved(user_id, article_id))
    }

    async fn save(&self, user_id: &UserId, article_id: &ArticleId) -> RemoteResult<String> {
        self.enter(RemoteOperation::Save, user_id, Some(article_id))
            .await?;

        let mut inner = self.inner.lock();
        let entries = inner.saved.entry(user_id.clone()).or_default();
        if entries.iter().any(|(id, _)| id == article_id) {
            return Ok("Article already saved".to_string());
        }
        entries.push((article_id.clone(), Utc::now()));
        Ok("Article saved".to_string())
    }

    async fn remove(&self, user_id: &UserId, article_id: &ArticleId) -> RemoteResult<String> {
        self.enter(RemoteOperation::Remove, user_id, Some(article_id))
            .await?;

        let mut inner = self.inner.lock();
        let Some(entries) = inner.saved.get_mut(user_id) else {
            return Ok("Article was not saved".to_string());
        };
        let before = entries.len();
        entries.retain(|(id, _)| id != article_id);
        if entries.len() == before {
            Ok("Article was not saved".to_string())
        } else {
            Ok("Article removed from saved".to_string())
        }
    }

    async fn get_user_saved_count(&self, user_id: &UserId) -> RemoteResult<u64> {
        self.enter(RemoteOperation::Count, user_id, None).await?;
        Ok(Self::count_for(&self.inner.lock(), user_id))
    }

    async fn get_user_saved_articles(&self, user_id: &UserId) -> RemoteResult<SavedArticlesPage> {
        self.enter(RemoteOperation::List, user_id, None).await?;

        let inner = self.inner.lock();
        let articles = inner
            .saved
            .get(user_id)
            .map(|entries| {
                entries
                    .iter()
                    .rev()
                    .map(|(id, saved_at)| SavedArticleSummary {
                        article_id: id.clone(),
                        article: inner
                            .catalog
                            .get(id)
                            .cloned()
                            .unwrap_or_else(|| ArticleSummary::titled(id.as_str())),
                        saved_at: Some(*saved_at),
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(SavedArticlesPage {
            count: Self::count_for(&inner, user_id),
            articles,
        })
    }
}
