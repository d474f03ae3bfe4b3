//! Identifiers and shared value types

use serde::{Deserialize, Serialize};
use stash_session::UserId;
use std::fmt;

/// Remote article identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub String);

impl ArticleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ArticleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ArticleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A (user, article) pair; the unit of caching and mutual exclusion
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationKey {
    pub user_id: UserId,
    pub article_id: ArticleId,
}

impl RelationKey {
    pub fn new(user_id: impl Into<UserId>, article_id: impl Into<ArticleId>) -> Self {
        Self {
            user_id: user_id.into(),
            article_id: article_id.into(),
        }
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.article_id)
    }
}

/// Cached saved-state of one relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SavedStatus {
    /// Never checked
    #[default]
    Unknown,
    /// A remote check is in flight
    Checking,
    Saved,
    NotSaved,
}

impl SavedStatus {
    pub fn from_saved(saved: bool) -> Self {
        if saved { Self::Saved } else { Self::NotSaved }
    }

    /// Whether this status reads as "saved"; everything but `Saved` is false
    pub fn is_saved(self) -> bool {
        matches!(self, Self::Saved)
    }

    /// The status a toggle moves towards
    pub fn toggled(self) -> Self {
        Self::from_saved(!self.is_saved())
    }
}

impl fmt::Display for SavedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Checking => write!(f, "checking"),
            Self::Saved => write!(f, "saved"),
            Self::NotSaved => write!(f, "not saved"),
        }
    }
}

/// Outcome tag of a successful mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveAction {
    Saved,
    Removed,
}

impl fmt::Display for SaveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved => write!(f, "saved"),
            Self::Removed => write!(f, "removed"),
        }
    }
}
