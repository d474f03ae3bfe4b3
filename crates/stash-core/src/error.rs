//! Error types for Stash
//!
//! Every failure the coordinators report falls into one of four categories:
//! - Transport: connectivity or timeout, shown with a generic message
//! - Rejected: the remote refused, its message is shown verbatim when present
//! - Precondition: missing identity or identifiers, never sent to the remote
//! - Persistence: the local store failed

use crate::remote::RemoteError;
use stash_session::SessionError;
use thiserror::Error;

/// Result type alias for Stash operations
pub type StashResult<T> = Result<T, StashError>;

/// Message shown for transport failures
pub const GENERIC_NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";

/// Message shown for rejections that carry no text
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Main error type for Stash
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StashError {
    /// Connectivity, timeout or undecodable response
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Business-level rejection by the remote
    #[error("Rejected: {}", message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    /// The operation cannot start in the current state
    #[error("Precondition failed: {message}")]
    Precondition { message: String },

    /// Local durable storage failed
    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

impl StashError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    pub fn not_signed_in() -> Self {
        Self::precondition("Please sign in to save articles.")
    }

    /// Unique code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "STASH_TRANSPORT",
            Self::Rejected { .. } => "STASH_REJECTED",
            Self::Precondition { .. } => "STASH_PRECONDITION",
            Self::Persistence { .. } => "STASH_PERSISTENCE",
        }
    }

    /// Message fit for direct display
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { .. } => GENERIC_NETWORK_MESSAGE.to_string(),
            Self::Rejected { message } => message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(GENERIC_FAILURE_MESSAGE)
                .to_string(),
            Self::Precondition { message } => message.clone(),
            Self::Persistence { .. } => {
                "Your change was applied but could not be stored on this device.".to_string()
            }
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<RemoteError> for StashError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Transport(message) => Self::Transport { message },
            RemoteError::Malformed(message) => Self::Transport { message },
            RemoteError::Rejected { message } => Self::Rejected { message },
        }
    }
}

impl From<SessionError> for StashError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotAuthenticated => Self::not_signed_in(),
            SessionError::Storage(e) => Self::Persistence {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_is_verbatim() {
        let err = StashError::from(RemoteError::rejected("You can save at most 500 articles"));
        assert_eq!(err.user_message(), "You can save at most 500 articles");
        assert_eq!(err.error_code(), "STASH_REJECTED");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_rejection_without_message_is_generic() {
        let err = StashError::Rejected {
            message: Some("   ".to_string()),
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_transport_hides_details() {
        let err = StashError::from(RemoteError::Transport("connection refused".into()));
        assert_eq!(err.user_message(), GENERIC_NETWORK_MESSAGE);
        assert!(err.is_retryable());

        let err = StashError::from(RemoteError::Malformed("missing count".into()));
        assert_eq!(err.error_code(), "STASH_TRANSPORT");
    }

    #[test]
    fn test_session_errors_convert() {
        let err = StashError::from(SessionError::NotAuthenticated);
        assert!(matches!(err, StashError::Precondition { .. }));
        assert!(!err.user_message().is_empty());
    }
}
