//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::credentials::Credentials;
use crate::model::{Platform, PlatformContent, Post, PostPatch, PublishResult};
use crate::policy::PolicyViolation;
use crate::status::TransitionError;
use crate::usecases::select::select_due;

/// Reasons a single platform attempt fails.
///
/// Never crosses the publisher boundary as an error: adapters fold it into a
/// failed [`PublishResult`] through [`PublishError::into_result`].
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{} credentials not configured", .0.display_name())]
    NotConfigured(Platform),
    #[error("No {} content", .0.display_name())]
    MissingContent(Platform),
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Network error: {0}")]
    Network(String),
}

impl PublishError {
    pub fn into_result(self) -> PublishResult {
        PublishResult::failed(self.to_string())
    }
}

/// Port for publishing one post's content to one platform
#[async_trait]
pub trait PlatformPublisher: Send + Sync {
    /// Attempt to publish. Always returns a well-formed result; failures of
    /// any kind are reported through `success: false`.
    async fn publish(
        &self,
        content: Option<&PlatformContent>,
        credentials: &Credentials,
    ) -> PublishResult;

    /// The platform this publisher talks to
    fn platform(&self) -> Platform;
}

/// Error type for post store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Post not found: {0}")]
    NotFound(String),
    #[error("Post already exists: {0}")]
    AlreadyExists(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
}

/// Port for persisting posts
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Every stored post
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError>;

    /// Posts due for publishing at `now`
    async fn list_due_posts(&self, now: OffsetDateTime) -> Result<Vec<Post>, StoreError> {
        Ok(select_due(self.list_posts().await?, now))
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError>;

    async fn create_post(&self, post: &Post) -> Result<(), StoreError>;

    /// Apply a partial update through [`Post::apply`] and return the stored
    /// record. Illegal status changes fail with
    /// [`StoreError::InvalidTransition`] and write nothing.
    async fn update_post(&self, id: &str, patch: PostPatch) -> Result<Post, StoreError>;

    /// Hard delete; returns whether a record was removed
    async fn delete_post(&self, id: &str) -> Result<bool, StoreError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
