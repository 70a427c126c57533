//! Reddit submission publisher

use async_trait::async_trait;
use crosspost_domain::{
    Credentials, Platform, PlatformContent, PlatformPublisher, PublishError, PublishResult,
    RedditContent,
    policy::{normalize_subreddit, validate_content},
};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;

use super::{DEFAULT_TIMEOUT, error_body, http_client, redact};

/// Submits self and link posts through the Reddit OAuth API
pub struct RedditPublisher {
    client: Client,
    base_url: String,
}

impl RedditPublisher {
    pub fn new() -> Self {
        Self::with_base_url("https://oauth.reddit.com".to_string(), DEFAULT_TIMEOUT)
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
            .reddit
            .resolve()
            .ok_or(PublishError::NotConfigured(Platform::Reddit))?;

        let content = content.ok_or(PublishError::MissingContent(Platform::Reddit))?;
        let submission = content
            .as_reddit()
            .ok_or(PublishError::MissingContent(Platform::Reddit))?;
        validate_content(content)?;

        let url = format!("{}/api/submit", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(auth.access_token.expose_secret())
            .header(reqwest::header::USER_AGENT, auth.user_agent)
            .form(&submit_params(submission))
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
                "Failed to submit: {}",
                error_body(response).await
            )));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(format!("Malformed response: {}", e)))?;

        // Reddit reports validation problems with a 200 and an errors array
        if let Some(error) = body.json.errors.first() {
            let message = error
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(": ");
            return Err(PublishError::Api(message));
        }

        let data = body
            .json
            .data
            .ok_or_else(|| PublishError::Api("Submission returned no data".to_string()))?;

        let url = data.url.unwrap_or_else(|| {
            format!(
                "https://www.reddit.com/r/{}/comments/{}/",
                normalize_subreddit(&submission.subreddit),
                data.id
            )
        });
        Ok((data.id, url))
    }
}

impl Default for RedditPublisher {
    fn default() -> Self {
        Self::new()
    }
}

fn submit_params(submission: &RedditContent) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("api_type", "json".to_string()),
        ("sr", normalize_subreddit(&submission.subreddit).to_string()),
        ("title", submission.title.clone()),
    ];

    match &submission.url {
        Some(url) => {
            params.push(("kind", "link".to_string()));
            params.push(("url", url.clone()));
        }
        None => {
            params.push(("kind", "self".to_string()));
            params.push(("text", submission.body.clone().unwrap_or_default()));
        }
    }

    if let Some(flair_id) = &submission.flair_id {
        params.push(("flair_id", flair_id.clone()));
    }
    if submission.nsfw {
        params.push(("nsfw", "true".to_string()));
    }

    params
}

#[derive(Deserialize)]
struct SubmitResponse {
    json: SubmitJson,
}

#[derive(Deserialize)]
struct SubmitJson {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
    data: Option<SubmitData>,
}

#[derive(Deserialize)]
struct SubmitData {
    id: String,
    url: Option<String>,
}

#[async_trait]
impl PlatformPublisher for RedditPublisher {
    async fn publish(
        &self,
        content: Option<&PlatformContent>,
        credentials: &Credentials,
    ) -> PublishResult {
        match self.try_publish(content, credentials).await {
            Ok((id, url)) => PublishResult::succeeded(id, url, OffsetDateTime::now_utc()),
            Err(e) => {
                tracing::debug!(error = %e, "Reddit submission not published");
                PublishResult::failed(redact(&e.to_string(), &credentials.secret_values()))
            }
        }
    }

    fn platform(&self) -> Platform {
        Platform::Reddit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosspost_domain::RedditCredentials;
    use secrecy::SecretString;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn submission(body: Option<&str>, url: Option<&str>) -> PlatformContent {
        PlatformContent::Reddit(RedditContent {
            subreddit: "r/rust".to_string(),
            title: "Release notes".to_string(),
            body: body.map(str::to_string),
            url: url.map(str::to_string),
            flair_id: None,
            nsfw: false,
        })
    }

    fn credentials() -> Credentials {
        Credentials {
            reddit: RedditCredentials {
                access_token: Some(SecretString::from("rd-token".to_string())),
                user_agent: Some("crosspost/0.1 by tester".to_string()),
            },
            ..Default::default()
        }
    }

    fn publisher(server: &MockServer) -> RedditPublisher {
        RedditPublisher::with_base_url(server.uri(), DEFAULT_TIMEOUT)
    }

    #[tokio::test]
    async fn test_self_post_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/submit"))
            .and(header("Authorization", "Bearer rd-token"))
            .and(header("User-Agent", "crosspost/0.1 by tester"))
            .and(body_string_contains("kind=self"))
            .and(body_string_contains("sr=rust"))
            .and(body_string_contains("api_type=json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "json": {
                    "errors": [],
                    "data": {
                        "id": "abc12",
                        "name": "t3_abc12",
                        "url": "https://www.reddit.com/r/rust/comments/abc12/release_notes/"
                    }
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = publisher(&mock_server)
            .publish(Some(&submission(Some("Details"), None)), &credentials())
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.post_id.as_deref(), Some("abc12"));
        assert_eq!(
            result.post_url.as_deref(),
            Some("https://www.reddit.com/r/rust/comments/abc12/release_notes/")
        );
    }

    #[tokio::test]
    async fn test_link_post_builds_url_when_missing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/submit"))
            .and(body_string_contains("kind=link"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "json": { "errors": [], "data": { "id": "xyz9" } }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = publisher(&mock_server)
            .publish(
                Some(&submission(None, Some("https://example.com"))),
                &credentials(),
            )
            .await;

        assert_eq!(
            result.post_url.as_deref(),
            Some("https://www.reddit.com/r/rust/comments/xyz9/")
        );
    }

    #[tokio::test]
    async fn test_reddit_error_array_is_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/submit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "json": {
                    "errors": [["SUBREDDIT_NOEXIST", "that subreddit doesn't exist", "sr"]]
                }
            })))
            .mount(&mock_server)
            .await;

        let result = publisher(&mock_server)
            .publish(Some(&submission(Some("Details"), None)), &credentials())
            .await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("API error: SUBREDDIT_NOEXIST: that subreddit doesn't exist: sr")
        );
    }

    #[tokio::test]
    async fn test_body_and_url_rejected_before_call() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = publisher(&mock_server)
            .publish(
                Some(&submission(Some("Details"), Some("https://example.com"))),
                &credentials(),
            )
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("either a body or a url"));
    }

    #[tokio::test]
    async fn test_missing_user_agent_is_unconfigured() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let mut credentials = credentials();
        credentials.reddit.user_agent = None;

        let result = publisher(&mock_server)
            .publish(Some(&submission(Some("Details"), None)), &credentials)
            .await;

        assert_eq!(
            result.error.as_deref(),
            Some("Reddit credentials not configured")
        );
    }

    #[test]
    fn test_submit_params_flags() {
        let content = RedditContent {
            subreddit: "/r/rust".to_string(),
            title: "t".to_string(),
            body: None,
            url: None,
            flair_id: Some("flair-1".to_string()),
            nsfw: true,
        };
        let params = submit_params(&content);
        assert!(params.contains(&("sr", "rust".to_string())));
        assert!(params.contains(&("text", String::new())));
        assert!(params.contains(&("flair_id", "flair-1".to_string())));
        assert!(params.contains(&("nsfw", "true".to_string())));
    }
}
