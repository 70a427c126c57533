//! Offline publisher that never touches the network

use async_trait::async_trait;
use crosspost_domain::{
    Credentials, Platform, PlatformContent, PlatformPublisher, PublishError, PublishResult,
    policy::validate_content,
};
use std::sync::Mutex;
use time::OffsetDateTime;

/// Accepts any valid content and reports a fake platform id.
///
/// Credentials are ignored so a whole pass can be exercised without accounts.
pub struct StubPublisher {
    platform: Platform,
    published: Mutex<Vec<PlatformContent>>,
}

impl StubPublisher {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            published: Mutex::new(vec![]),
        }
    }

    /// Everything this publisher accepted, in order
    pub fn published(&self) -> Vec<PlatformContent> {
        self.published
            .lock()
            .map(|published| published.clone())
            .unwrap_or_default()
    }

    fn accept(&self, content: Option<&PlatformContent>) -> Result<String, PublishError> {
        let content = content
            .filter(|c| c.platform() == self.platform)
            .ok_or(PublishError::MissingContent(self.platform))?;
        validate_content(content)?;

        let mut published = self
            .published
            .lock()
            .map_err(|e| PublishError::Api(e.to_string()))?;
        published.push(content.clone());
        Ok(format!("stub_{}_{}", self.platform, published.len()))
    }
}

#[async_trait]
impl PlatformPublisher for StubPublisher {
    async fn publish(
        &self,
        content: Option<&PlatformContent>,
        _credentials: &Credentials,
    ) -> PublishResult {
        match self.accept(content) {
            Ok(id) => {
                let url = format!("https://stub.invalid/{}/{}", self.platform, id);
                PublishResult::succeeded(id, url, OffsetDateTime::now_utc())
            }
            Err(e) => e.into_result(),
        }
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}
