//! LinkedIn UGC post publisher

use async_trait::async_trait;
use crosspost_domain::{
    Credentials, LinkedinContent, LinkedinVisibility, Platform, PlatformContent,
    PlatformPublisher, PublishError, PublishResult, policy::validate_content,
};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use time::OffsetDateTime;

use super::{DEFAULT_TIMEOUT, error_body, http_client, redact};

pub struct LinkedinPublisher {
    client: Client,
    base_url: String,
}

impl LinkedinPublisher {
    pub fn new() -> Self {
        Self::with_base_url("https://api.linkedin.com".to_string(), DEFAULT_TIMEOUT)
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
            .linkedin
            .resolve()
            .ok_or(PublishError::NotConfigured(Platform::Linkedin))?;

        let content = content.ok_or(PublishError::MissingContent(Platform::Linkedin))?;
        let share = content
            .as_linkedin()
            .ok_or(PublishError::MissingContent(Platform::Linkedin))?;
        validate_content(content)?;

        let url = format!("{}/v2/ugcPosts", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(auth.access_token.expose_secret())
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&ugc_post_body(auth.author_urn, share))
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if response.status() == 401 {
            return Err(PublishError::Auth("Invalid access token".to_string()));
        }

        if response.status() == 429 {
            return Err(PublishError::RateLimited);
        }

        if !response.status().is_success() {
            return Err(PublishError::Api(format!(
                "Failed to create share: {}",
                error_body(response).await
            )));
        }

        // The created URN comes back in a header; some API versions also
        // echo it in the body
        let header_id = response
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let id = match header_id {
            Some(id) => id,
            None => {
                let body: UgcPostResponse = response
                    .json()
                    .await
                    .map_err(|e| PublishError::Api(format!("Malformed response: {}", e)))?;
                body.id
            }
        };

        let url = format!("https://www.linkedin.com/feed/update/{}", id);
        Ok((id, url))
    }
}

impl Default for LinkedinPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct UgcPostResponse {
    id: String,
}

fn ugc_post_body(author_urn: &str, share: &LinkedinContent) -> Value {
    let visibility = match share.visibility {
        LinkedinVisibility::Public => "PUBLIC",
        LinkedinVisibility::Connections => "CONNECTIONS",
    };

    let (media_category, media) = match &share.article_url {
        Some(url) => ("ARTICLE", json!([{ "status": "READY", "originalUrl": url }])),
        None => ("NONE", json!([])),
    };

    json!({
        "author": author_urn,
        "lifecycleState": "PUBLISHED",
        "specificContent": {
            "com.linkedin.ugc.ShareContent": {
                "shareCommentary": { "text": share.text },
                "shareMediaCategory": media_category,
                "media": media
            }
        },
        "visibility": {
            "com.linkedin.ugc.MemberNetworkVisibility": visibility
        }
    })
}

#[async_trait]
impl PlatformPublisher for LinkedinPublisher {
    async fn publish(
        &self,
        content: Option<&PlatformContent>,
        credentials: &Credentials,
    ) -> PublishResult {
        match self.try_publish(content, credentials).await {
            Ok((id, url)) => PublishResult::succeeded(id, url, OffsetDateTime::now_utc()),
            Err(e) => {
                tracing::debug!(error = %e, "LinkedIn share not published");
                PublishResult::failed(redact(&e.to_string(), &credentials.secret_values()))
            }
        }
    }

    fn platform(&self) -> Platform {
        Platform::Linkedin
    }
}
