//! Publish pass use case - selects due posts, fans out to platforms, and
//! resolves each post to a terminal status

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use futures::stream::{FuturesUnordered, StreamExt};
use time::OffsetDateTime;
use tokio::time::sleep;

use crate::{
    credentials::Credentials,
    model::{Platform, Post, PostPatch, PublishResult, PublishResults},
    ports::{Clock, PlatformPublisher, PostStore, StoreError},
    status::PostStatus,
    usecases::{
        report::{PostOutcome, RunSummary},
        select::select_due,
        throttle::DispatchThrottle,
    },
};

/// Configuration for a publish pass
#[derive(Debug, Clone)]
pub struct PublishPassConfig {
    /// Log due posts without dispatching or writing anything
    pub dry_run: bool,
    /// Maximum posts in flight at once
    pub max_concurrent_posts: usize,
    /// Max posts dispatched per minute (None = unlimited)
    pub rate_limit_per_minute: Option<u32>,
    /// Max posts dispatched per hour (None = unlimited)
    pub rate_limit_per_hour: Option<u32>,
}

impl Default for PublishPassConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_concurrent_posts: 4,
            rate_limit_per_minute: None,
            rate_limit_per_hour: None,
        }
    }
}

/// Publishers keyed by the platform they serve
#[derive(Clone, Default)]
pub struct Publishers {
    by_platform: HashMap<Platform, Arc<dyn PlatformPublisher>>,
}

impl Publishers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a publisher, replacing any previous one for its platform
    pub fn register(&mut self, publisher: Arc<dyn PlatformPublisher>) {
        self.by_platform.insert(publisher.platform(), publisher);
    }

    pub fn with(mut self, publisher: Arc<dyn PlatformPublisher>) -> Self {
        self.register(publisher);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformPublisher>> {
        self.by_platform.get(&platform).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<_> = self.by_platform.keys().copied().collect();
        platforms.sort();
        platforms
    }
}

/// Errors that abort a whole pass
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error("Post store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Publish orchestrator
pub struct PublishPass<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    store: Arc<St>,
    publishers: Publishers,
    credentials: Arc<Credentials>,
    clock: Arc<Cl>,
    config: PublishPassConfig,
    throttle: Arc<DispatchThrottle>,
}

impl<St, Cl> PublishPass<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        store: Arc<St>,
        publishers: Publishers,
        credentials: Arc<Credentials>,
        clock: Arc<Cl>,
        config: PublishPassConfig,
    ) -> Self {
        let throttle = Arc::new(DispatchThrottle::new(
            config.rate_limit_per_minute,
            config.rate_limit_per_hour,
        ));
        Self {
            store,
            publishers,
            credentials,
            clock,
            config,
            throttle,
        }
    }

    /// Run a pass at the clock's current time
    pub async fn run_pass(&self) -> Result<RunSummary, PassError> {
        self.run_once(self.clock.now()).await
    }

    /// Run a single pass over the posts due at `now`
    pub async fn run_once(&self, now: OffsetDateTime) -> Result<RunSummary, PassError> {
        self.run_until(now, std::future::pending()).await
    }

    /// Run a pass that stops dispatching new posts once `shutdown` resolves.
    ///
    /// Posts already in flight finish and are written; due posts not yet
    /// dispatched stay scheduled and are counted as deferred.
    pub async fn run_until<F>(&self, now: OffsetDateTime, shutdown: F) -> Result<RunSummary, PassError>
    where
        F: Future<Output = ()>,
    {
        // Re-filter so an adapter with a loose query cannot hand us
        // posts outside the due set
        let due = select_due(self.store.list_due_posts(now).await?, now);

        let mut summary = RunSummary::new(now, self.config.dry_run);
        summary.considered = due.len();

        if due.is_empty() {
            tracing::debug!("No due posts");
            summary.finish(self.clock.now());
            return Ok(summary);
        }

        tracing::info!(count = due.len(), now = %now, "Found due posts");

        if self.config.dry_run {
            for post in &due {
                tracing::info!(
                    post_id = %post.id,
                    platforms = ?post.pending_platforms(),
                    scheduled_at = ?post.scheduled_at,
                    "[DRY RUN] Would publish"
                );
            }
            summary.finish(self.clock.now());
            return Ok(summary);
        }

        let max_concurrent = self.config.max_concurrent_posts.max(1);
        let mut tasks: FuturesUnordered<BoxFuture<'_, PostOutcome>> = FuturesUnordered::new();
        let mut queue = due.into_iter().peekable();
        let mut stopping = false;
        tokio::pin!(shutdown);

        loop {
            if !stopping && shutdown.as_mut().now_or_never().is_some() {
                stopping = true;
                tracing::info!(
                    in_flight = tasks.len(),
                    remaining = queue.len(),
                    "Shutdown requested, finishing in-flight posts"
                );
            }

            let has_slot = !stopping && tasks.len() < max_concurrent && queue.peek().is_some();
            if has_slot {
                let delay = self.throttle.delay().await;
                if delay.is_zero() {
                    if let Some(post) = queue.next() {
                        self.throttle.record().await;
                        tasks.push(Box::pin(self.process_post(post, now)));
                    }
                    continue;
                }

                tracing::debug!(wait_secs = delay.as_secs(), "Dispatch throttled");
                tokio::select! {
                    biased;
                    _ = &mut shutdown => {
                        stopping = true;
                        tracing::info!(
                            in_flight = tasks.len(),
                            remaining = queue.len(),
                            "Shutdown requested while throttled"
                        );
                    }
                    Some(outcome) = tasks.next(), if !tasks.is_empty() => summary.record(outcome),
                    _ = sleep(delay) => {}
                }
                continue;
            }

            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = &mut shutdown, if !stopping => {
                    stopping = true;
                    tracing::info!(
                        in_flight = tasks.len(),
                        remaining = queue.len(),
                        "Shutdown requested, finishing in-flight posts"
                    );
                }
                Some(outcome) = tasks.next() => summary.record(outcome),
            }
        }

        summary.deferred = queue.len();
        summary.finish(self.clock.now());

        tracing::info!(
            considered = summary.considered,
            published = summary.published,
            failed = summary.failed,
            persist_errors = summary.persist_errors,
            deferred = summary.deferred,
            "Publish pass complete"
        );

        Ok(summary)
    }

    /// Publish one post to its pending platforms and write the outcome
    async fn process_post(&self, post: Post, now: OffsetDateTime) -> PostOutcome {
        // Earlier successes are kept and not re-sent
        let mut results: PublishResults = post
            .publish_results
            .iter()
            .filter(|(platform, _)| post.platforms.contains(platform))
            .map(|(platform, result)| (*platform, result.clone()))
            .collect();

        if post.platforms.is_empty() {
            tracing::warn!(post_id = %post.id, "Due post targets no platforms");
        } else {
            let pending = post.pending_platforms();
            for (platform, result) in self.dispatch(&post, &pending).await {
                results.insert(platform, result);
            }
        }

        let all_succeeded = !post.platforms.is_empty()
            && post
                .platforms
                .iter()
                .all(|p| results.get(p).is_some_and(|r| r.success));
        let status = if all_succeeded {
            PostStatus::Published
        } else {
            PostStatus::Failed
        };

        let patch = PostPatch::new(now)
            .status(status)
            .publish_results(results.clone());

        let persisted = match self.store.update_post(&post.id, patch).await {
            Ok(_) => {
                tracing::info!(post_id = %post.id, status = %status, "Post resolved");
                true
            }
            Err(e) => {
                tracing::error!(
                    post_id = %post.id,
                    status = %status,
                    error = %e,
                    "Failed to write post outcome, it stays scheduled"
                );
                false
            }
        };

        PostOutcome {
            post_id: post.id,
            status,
            results,
            persisted,
        }
    }

    /// Call every platform at once and wait for all of them to settle
    async fn dispatch(&self, post: &Post, platforms: &[Platform]) -> Vec<(Platform, PublishResult)> {
        let calls = platforms.iter().map(|&platform| {
            let publisher = self.publishers.get(platform);
            let content = post.content_for(platform).cloned();
            let credentials = Arc::clone(&self.credentials);
            let post_id = post.id.clone();

            async move {
                let Some(publisher) = publisher else {
                    tracing::error!(post_id = %post_id, platform = %platform, "No publisher registered");
                    return (
                        platform,
                        PublishResult::failed(format!(
                            "No publisher registered for {}",
                            platform.display_name()
                        )),
                    );
                };

                let task = tokio::spawn(async move {
                    publisher.publish(content.as_ref(), &credentials).await
                });

                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!(
                            post_id = %post_id,
                            platform = %platform,
                            error = %e,
                            "Publish task did not complete"
                        );
                        PublishResult::failed(format!(
                            "{} publish task aborted",
                            platform.display_name()
                        ))
                    }
                };

                if result.success {
                    tracing::info!(
                        post_id = %post_id,
                        platform = %platform,
                        remote_id = ?result.post_id,
                        "Published to platform"
                    );
                } else {
                    tracing::warn!(
                        post_id = %post_id,
                        platform = %platform,
                        error = ?result.error,
                        "Platform publish failed"
                    );
                }

                (platform, result)
            }
        });

        join_all(calls).await
    }
}
