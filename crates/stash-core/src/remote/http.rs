//! HTTP implementation of the saved-articles service
//!
//! Every endpoint answers with the same JSON envelope:
//! `{"success": bool, "message"?: string, "isSaved"?: bool, "count"?: int, "data"?: [...]}`.

use super::{
    RemoteError, RemoteResult, SavedArticleSummary, SavedArticlesPage, SavedArticlesService,
};
use crate::config::{ConfigError, RemoteConfig};
use crate::types::ArticleId;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use stash_session::UserId;
use tracing::{debug, instrument};

/// Response envelope shared by all endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    is_saved: Option<bool>,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    data: Option<Vec<SavedArticleSummary>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelationBody<'a> {
    user_id: &'a str,
    article_id: &'a str,
}

/// Decode a response body into an envelope, classifying failures
fn decode_envelope(status: StatusCode, body: &str) -> RemoteResult<Envelope> {
    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => {
            return Err(RemoteError::Malformed(format!(
                "failed to decode response: {}",
                e
            )));
        }
        Err(_) => {
            return Err(RemoteError::Transport(format!(
                "remote answered with status {}",
                status
            )));
        }
    };

    if !envelope.success {
        return Err(RemoteError::Rejected {
            message: envelope.message.filter(|m| !m.trim().is_empty()),
        });
    }

    if !status.is_success() {
        return Err(RemoteError::Transport(format!(
            "remote answered with status {}",
            status
        )));
    }

    Ok(envelope)
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Transport("request timed out".to_string())
    } else if e.is_connect() {
        RemoteError::Transport(format!("could not connect: {}", e))
    } else {
        RemoteError::Transport(e.to_string())
    }
}

/// Saved-articles service reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpSavedArticlesService {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpSavedArticlesService {
    /// Build a client from remote configuration
    pub fn new(config: &RemoteConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| ConfigError::Invalid {
            key: "remote.base_url".to_string(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                key: "remote.base_url".to_string(),
                message: format!("'{}' cannot be used as a base URL", config.base_url),
            });
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "remote".to_string(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> RemoteResult<Envelope> {
        let response = self
            .authorize(request)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        debug!("Remote answered {} ({} bytes)", status, body.len());

        decode_envelope(status, &body)
    }
}

#[async_trait]
impl SavedArticlesService for HttpSavedArticlesService {
    #[instrument(skip(self), level = "debug")]
    async fn check_saved(&self, user_id: &UserId, article_id: &ArticleId) -> RemoteResult<bool> {
        let mut url = self.endpoint(&["saved-articles", "check"]);
        url.query_pairs_mut()
            .append_pair("userId", user_id.as_str())
            .append_pair("articleId", article_id.as_str());

        let envelope = self.execute(self.client.get(url)).await?;
        envelope
            .is_saved
            .ok_or_else(|| RemoteError::Malformed("missing isSaved".to_string()))
    }

    #[instrument(skip(self), level = "debug")]
    async fn save(&self, user_id: &UserId, article_id: &ArticleId) -> RemoteResult<String> {
        let url = self.endpoint(&["saved-articles"]);
        let body = RelationBody {
            user_id: user_id.as_str(),
            article_id: article_id.as_str(),
        };

        let envelope = self.execute(self.client.post(url).json(&body)).await?;
        Ok(envelope.message.unwrap_or_default())
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove(&self, user_id: &UserId, article_id: &ArticleId) -> RemoteResult<String> {
        let url = self.endpoint(&["saved-articles", user_id.as_str(), article_id.as_str()]);

        let envelope = self.execute(self.client.delete(url)).await?;
        Ok(envelope.message.unwrap_or_default())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_user_saved_count(&self, user_id: &UserId) -> RemoteResult<u64> {
        let url = self.endpoint(&["saved-articles", "user", user_id.as_str(), "count"]);

        let envelope = self.execute(self.client.get(url)).await?;
        envelope
            .count
            .ok_or_else(|| RemoteError::Malformed("missing count".to_string()))
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_user_saved_articles(&self, user_id: &UserId) -> RemoteResult<SavedArticlesPage> {
        let url = self.endpoint(&["saved-articles", "user", user_id.as_str()]);

        let envelope = self.execute(self.client.get(url)).await?;
        let articles = envelope
            .data
            .ok_or_else(|| RemoteError::Malformed("missing data".to_string()))?;
        let count = envelope.count.unwrap_or(articles.len() as u64);

        Ok(SavedArticlesPage { articles, count })
    }
}
