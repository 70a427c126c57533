//! X (Twitter) API publisher

use async_trait::async_trait;
use crosspost_domain::{
    Credentials, Platform, PlatformContent, PlatformPublisher, PublishError, PublishResult,
    TwitterContent, policy::validate_content,
};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;

use super::{DEFAULT_TIMEOUT, error_body, http_client, redact};

/// Publishes tweets through the X API v2
pub struct TwitterPublisher {
    client: Client,
    base_url: String,
}

impl TwitterPublisher {
    pub fn new() -> Self {
        Self::with_base_url("https://api.twitter.com".to_string(), DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(base_url: String, timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn try_publish(
        &self,
        content: Option<&PlatformContent>,
        credentials: &Credentials,
    ) -> Result<(String, String), PublishError> {
        let auth = credentials
            .twitter
            .resolve()
            .ok_or(PublishError::NotConfigured(Platform::Twitter))?;

        let content = content.ok_or(PublishError::MissingContent(Platform::Twitter))?;
        let tweet = content
            .as_twitter()
            .ok_or(PublishError::MissingContent(Platform::Twitter))?;
        validate_content(content)?;

        let url = format!("{}/2/tweets", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(auth.access_token.expose_secret())
            .json(&CreateTweetRequest::from(tweet))
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if response.status() == 401 {
            return Err(PublishError::Auth("Invalid user token".to_string()));
        }

        if response.status() == 429 {
            return Err(PublishError::RateLimited);
        }

        if !response.status().is_success() {
            return Err(PublishError::Api(format!(
                "Failed to create tweet: {}",
                error_body(response).await
            )));
        }

        let tweet_response: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(format!("Malformed response: {}", e)))?;

        let id = tweet_response.data.id;
        let url = format!("https://twitter.com/i/status/{}", id);
        Ok((id, url))
    }
}

impl Default for TwitterPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaSettings<'a>>,
}

#[derive(Serialize)]
struct MediaSettings<'a> {
    media_ids: &'a [String],
}

impl<'a> From<&'a TwitterContent> for CreateTweetRequest<'a> {
    fn from(content: &'a TwitterContent) -> Self {
        Self {
            text: &content.text,
            media: (!content.media_ids.is_empty()).then_some(MediaSettings {
                media_ids: &content.media_ids,
            }),
        }
    }
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[async_trait]
impl PlatformPublisher for TwitterPublisher {
    async fn publish(
        &self,
        content: Option<&PlatformContent>,
        credentials: &Credentials,
    ) -> PublishResult {
        match self.try_publish(content, credentials).await {
            Ok((id, url)) => PublishResult::succeeded(id, url, OffsetDateTime::now_utc()),
            Err(e) => {
                tracing::debug!(error = %e, "Tweet not published");
                PublishResult::failed(redact(&e.to_string(), &credentials.secret_values()))
            }
        }
    }

    fn platform(&self) -> Platform {
        Platform::Twitter
    }
}
