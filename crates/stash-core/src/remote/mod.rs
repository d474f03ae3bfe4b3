//! Remote saved-articles service contract
//!
//! The remote is the single authority for saved relations. Business-level
//! rejections and transport failures are kept apart so that callers can show a
//! server message verbatim but only a generic one for connectivity problems.

mod http;
mod memory;

pub use http::HttpSavedArticlesService;
pub use memory::{InMemorySavedArticles, RemoteCall, RemoteOperation};

use crate::types::ArticleId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stash_session::UserId;
use thiserror::Error;

/// Remote call errors
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Connectivity or timeout problem; nothing is known about the outcome
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote refused the operation (`success: false`)
    #[error("Rejected by remote: {}", message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    /// A response arrived but could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: Some(message.into()),
        }
    }
}

/// Result type for remote calls
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Display fields of an article
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl ArticleSummary {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// One entry of the user's saved list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedArticleSummary {
    pub article_id: ArticleId,

    #[serde(rename = "articleSummary")]
    pub article: ArticleSummary,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Full saved list with the remote's count
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SavedArticlesPage {
    pub articles: Vec<SavedArticleSummary>,
    pub count: u64,
}

/// Remote saved-articles service
///
/// All operations are request/response. `save` and `remove` are idempotent in
/// effect; the message they return may differ between repeated calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SavedArticlesService: Send + Sync {
    /// Whether `user_id` has saved `article_id`
    async fn check_saved(&self, user_id: &UserId, article_id: &ArticleId) -> RemoteResult<bool>;

    /// Save the article; returns the remote's message
    async fn save(&self, user_id: &UserId, article_id: &ArticleId) -> RemoteResult<String>;

    /// Remove the article; returns the remote's message
    async fn remove(&self, user_id: &UserId, article_id: &ArticleId) -> RemoteResult<String>;

    /// Number of articles the user has saved
    async fn get_user_saved_count(&self, user_id: &UserId) -> RemoteResult<u64>;

    /// The user's full saved list
    async fn get_user_saved_articles(&self, user_id: &UserId) -> RemoteResult<SavedArticlesPage>;
}
