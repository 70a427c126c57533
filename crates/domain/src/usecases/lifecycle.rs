//! User-initiated status changes, checked against the same transition table
//! the publish pass uses

use std::sync::Arc;
use time::OffsetDateTime;

use crate::{
    model::{Post, PostPatch, PublishResults},
    ports::{Clock, PostStore, StoreError},
    status::{PostStatus, TransitionError},
};

/// Errors from lifecycle operations. The stored post is unchanged whenever
/// one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Post not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    InvalidTransition(TransitionError),
    #[error("Scheduling requires a time; use schedule")]
    MissingScheduleTime,
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LifecycleError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => LifecycleError::NotFound(id),
            StoreError::InvalidTransition(e) => LifecycleError::InvalidTransition(e),
            other => LifecycleError::Store(other),
        }
    }
}

/// Status validation surface for callers outside the publish pass
pub struct PostLifecycle<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    store: Arc<St>,
    clock: Arc<Cl>,
}

impl<St, Cl> PostLifecycle<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(store: Arc<St>, clock: Arc<Cl>) -> Self {
        Self { store, clock }
    }

    async fn load(&self, id: &str) -> Result<Post, LifecycleError> {
        self.store
            .get_post(id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(id.to_string()))
    }

    async fn transition(&self, id: &str, patch: PostPatch) -> Result<Post, LifecycleError> {
        let post = self.load(id).await?;
        if let Some(to) = patch.status {
            post.status
                .validate_transition(to)
                .map_err(LifecycleError::InvalidTransition)?;
        }
        let updated = self.store.update_post(id, patch).await?;
        tracing::info!(
            post_id = %id,
            from = %post.status,
            to = %updated.status,
            "Post status changed"
        );
        Ok(updated)
    }

    /// Move a post to `to`. Scheduling goes through [`Self::schedule`] since it
    /// needs a time.
    pub async fn change_status(&self, id: &str, to: PostStatus) -> Result<Post, LifecycleError> {
        if to == PostStatus::Scheduled {
            let post = self.load(id).await?;
            if post.status != PostStatus::Scheduled || post.scheduled_at.is_none() {
                return Err(LifecycleError::MissingScheduleTime);
            }
        }
        self.transition(id, PostPatch::new(self.clock.now()).status(to))
            .await
    }

    /// Schedule (or reschedule) a post for `at`.
    ///
    /// Earlier per-platform results are kept, so a failed post that is
    /// rescheduled only retries the platforms that did not succeed.
    pub async fn schedule(&self, id: &str, at: OffsetDateTime) -> Result<Post, LifecycleError> {
        self.transition(
            id,
            PostPatch::new(self.clock.now())
                .status(PostStatus::Scheduled)
                .scheduled_at(Some(at)),
        )
        .await
    }

    /// Schedule a post for a fresh attempt on every platform, discarding
    /// earlier results
    pub async fn republish(&self, id: &str, at: OffsetDateTime) -> Result<Post, LifecycleError> {
        self.transition(
            id,
            PostPatch::new(self.clock.now())
                .status(PostStatus::Scheduled)
                .scheduled_at(Some(at))
                .publish_results(PublishResults::new()),
        )
        .await
    }

    /// Soft delete
    pub async fn archive(&self, id: &str) -> Result<Post, LifecycleError> {
        self.change_status(id, PostStatus::Archived).await
    }

    /// Bring an archived post back as a draft
    pub async fn restore(&self, id: &str) -> Result<Post, LifecycleError> {
        let post = self.load(id).await?;
        if post.status != PostStatus::Archived {
            return Err(LifecycleError::InvalidTransition(TransitionError {
                from: post.status,
                to: PostStatus::Draft,
            }));
        }
        self.change_status(id, PostStatus::Draft).await
    }
}
