//! In-memory post store for testing and offline mode

use async_trait::async_trait;
use crosspost_domain::{Post, PostPatch, PostStore, StoreError};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory post store implementation
pub struct InMemoryPostStore {
    posts: RwLock<HashMap<String, Post>>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self {
            posts: RwLock::new(HashMap::new()),
        }
    }

    /// Store pre-populated with `posts`
    pub fn with_posts(posts: impl IntoIterator<Item = Post>) -> Self {
        Self {
            posts: RwLock::new(posts.into_iter().map(|p| (p.id.clone(), p)).collect()),
        }
    }
}

impl Default for InMemoryPostStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let posts = self
            .posts
            .read()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let mut all: Vec<Post> = posts.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let posts = self
            .posts
            .read()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(posts.get(id).cloned())
    }

    async fn create_post(&self, post: &Post) -> Result<(), StoreError> {
        let mut posts = self
            .posts
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if posts.contains_key(&post.id) {
            return Err(StoreError::AlreadyExists(post.id.clone()));
        }
        posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn update_post(&self, id: &str, patch: PostPatch) -> Result<Post, StoreError> {
        let mut posts = self
            .posts
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let stored = posts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        // Patch a copy so a rejected transition leaves the record untouched
        let mut updated = stored.clone();
        updated.apply(patch)?;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete_post(&self, id: &str) -> Result<bool, StoreError> {
        let mut posts = self
            .posts
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(posts.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosspost_domain::{
        Platform, PlatformContent, PostContent, PostStatus, PublishResult, TwitterContent,
    };
    use std::collections::{BTreeMap, BTreeSet};
    use time::macros::datetime;

    fn post(at: Option<time::OffsetDateTime>) -> Post {
        let platforms = BTreeSet::from([Platform::Twitter]);
        let content = PostContent::new().with(PlatformContent::Twitter(TwitterContent {
            text: "hello".to_string(),
            media_ids: vec![],
        }));
        let created = datetime!(2024-01-01 00:00 UTC);
        match at {
            Some(at) => Post::scheduled(platforms, content, at, created).unwrap(),
            None => Post::new(platforms, content, created).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryPostStore::new();
        let post = post(None);

        store.create_post(&post).await.unwrap();

        assert_eq!(store.get_post(&post.id).await.unwrap(), Some(post.clone()));
        assert!(store.get_post("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let store = InMemoryPostStore::new();
        let post = post(None);
        store.create_post(&post).await.unwrap();

        assert!(matches!(
            store.create_post(&post).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_list_due_posts() {
        let due = post(Some(datetime!(2024-01-01 00:00 UTC)));
        let future = post(Some(datetime!(2024-01-02 00:00 UTC)));
        let draft = post(None);
        let store = InMemoryPostStore::with_posts([due.clone(), future, draft]);

        let listed = store
            .list_due_posts(datetime!(2024-01-01 12:00 UTC))
            .await
            .unwrap();

        assert_eq!(listed, vec![due]);
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let post = post(Some(datetime!(2024-01-01 00:00 UTC)));
        let store = InMemoryPostStore::with_posts([post.clone()]);
        let updated_at = datetime!(2024-01-01 00:05 UTC);
        let results = BTreeMap::from([(
            Platform::Twitter,
            PublishResult::succeeded("1", "https://twitter.com/i/status/1", updated_at),
        )]);

        let updated = store
            .update_post(
                &post.id,
                PostPatch::new(updated_at)
                    .status(PostStatus::Published)
                    .publish_results(results.clone()),
            )
            .await
            .unwrap();

        assert_eq!(updated.status, PostStatus::Published);
        assert_eq!(updated.publish_results, results);
        assert_eq!(updated.updated_at, updated_at);
        assert_eq!(store.get_post(&post.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_invalid_transition_writes_nothing() {
        let mut published = post(Some(datetime!(2024-01-01 00:00 UTC)));
        published.status = PostStatus::Published;
        let store = InMemoryPostStore::with_posts([published.clone()]);

        let result = store
            .update_post(
                &published.id,
                PostPatch::new(datetime!(2024-01-03 00:00 UTC)).status(PostStatus::Draft),
            )
            .await;

        assert!(matches!(result, Err(StoreError::InvalidTransition(_))));
        assert_eq!(store.get_post(&published.id).await.unwrap(), Some(published));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = InMemoryPostStore::new();

        assert!(matches!(
            store
                .update_post("missing", PostPatch::new(datetime!(2024-01-01 00:00 UTC)))
                .await,
            Err(StoreError::NotFound(_))
        ));
        assert!(!store.delete_post("missing").await.unwrap());
    }
}
