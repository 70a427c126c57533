//! SQLite post store implementation

use async_trait::async_trait;
use crosspost_domain::{
    Post, PostPatch, PostStatus, PostStore, StoreError, usecases::select_due,
};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::time::Duration;
use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};

const COLUMNS: &str = "id, status, platforms, content, publish_results, scheduled_at, \
                       created_at, updated_at, campaign_id, group_id, group_type";

/// How long a writer waits on another connection's lock before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Attempts at an update whose row keeps changing underneath it
const MAX_UPDATE_ATTEMPTS: usize = 5;

/// SQLite-backed post store
pub struct SqlitePostStore {
    pool: SqlitePool,
}

impl SqlitePostStore {
    /// Open (or create) the database at `db_path` and bring the schema up to date
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                platforms TEXT NOT NULL,
                content TEXT NOT NULL,
                publish_results TEXT NOT NULL,
                scheduled_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                campaign_id TEXT,
                group_id TEXT,
                group_type TEXT,
                revision INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        // Due-post scans filter on both columns
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_posts_due
            ON posts(status, scheduled_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}

fn format_time(at: OffsetDateTime) -> Result<String, StoreError> {
    at.to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn parse_time(value: &str) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn from_json<T: DeserializeOwned>(value: &str) -> Result<T, StoreError> {
    serde_json::from_str(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Database(e.to_string()))
}

fn decode_post(row: &SqliteRow) -> Result<Post, StoreError> {
    let status: String = column(row, "status")?;
    let scheduled_at: Option<String> = column(row, "scheduled_at")?;
    let group_type: Option<String> = column(row, "group_type")?;

    Ok(Post {
        id: column(row, "id")?,
        status: status
            .parse::<PostStatus>()
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        platforms: from_json(&column::<String>(row, "platforms")?)?,
        content: from_json(&column::<String>(row, "content")?)?,
        publish_results: from_json(&column::<String>(row, "publish_results")?)?,
        scheduled_at: scheduled_at.as_deref().map(parse_time).transpose()?,
        created_at: parse_time(&column::<String>(row, "created_at")?)?,
        updated_at: parse_time(&column::<String>(row, "updated_at")?)?,
        campaign_id: column(row, "campaign_id")?,
        group_id: column(row, "group_id")?,
        group_type: group_type.as_deref().map(from_json).transpose()?,
    })
}

/// Column values for one post, in [`COLUMNS`] order
struct EncodedPost {
    id: String,
    status: &'static str,
    platforms: String,
    content: String,
    publish_results: String,
    scheduled_at: Option<String>,
    created_at: String,
    updated_at: String,
    campaign_id: Option<String>,
    group_id: Option<String>,
    group_type: Option<String>,
}

impl EncodedPost {
    fn new(post: &Post) -> Result<Self, StoreError> {
        Ok(Self {
            id: post.id.clone(),
            status: post.status.as_str(),
            platforms: to_json(&post.platforms)?,
            content: to_json(&post.content)?,
            publish_results: to_json(&post.publish_results)?,
            scheduled_at: post.scheduled_at.map(format_time).transpose()?,
            created_at: format_time(post.created_at)?,
            updated_at: format_time(post.updated_at)?,
            campaign_id: post.campaign_id.clone(),
            group_id: post.group_id.clone(),
            group_type: post.group_type.as_ref().map(to_json).transpose()?,
        })
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn list_posts(&self) -> Result<Vec<Post>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts ORDER BY created_at, id",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(decode_post).collect()
    }

    async fn list_due_posts(&self, now: OffsetDateTime) -> Result<Vec<Post>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts \
             WHERE status = ? AND scheduled_at IS NOT NULL \
             ORDER BY scheduled_at, id",
            COLUMNS
        ))
        .bind(PostStatus::Scheduled.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let posts = rows.iter().map(decode_post).collect::<Result<Vec<_>, _>>()?;
        Ok(select_due(posts, now))
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(decode_post).transpose()
    }

    async fn create_post(&self, post: &Post) -> Result<(), StoreError> {
        let encoded = EncodedPost::new(post)?;

        sqlx::query(&format!(
            "INSERT INTO posts ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            COLUMNS
        ))
        .bind(&encoded.id)
        .bind(encoded.status)
        .bind(&encoded.platforms)
        .bind(&encoded.content)
        .bind(&encoded.publish_results)
        .bind(&encoded.scheduled_at)
        .bind(&encoded.created_at)
        .bind(&encoded.updated_at)
        .bind(&encoded.campaign_id)
        .bind(&encoded.group_id)
        .bind(&encoded.group_type)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::AlreadyExists(post.id.clone())
            }
            other => StoreError::Database(other.to_string()),
        })?;

        Ok(())
    }

    async fn update_post(&self, id: &str, patch: PostPatch) -> Result<Post, StoreError> {
        // The write lands only if the revision is unchanged since the read
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let row = sqlx::query(&format!(
                "SELECT {}, revision FROM posts WHERE id = ?",
                COLUMNS
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

            let revision: i64 = column(&row, "revision")?;
            let mut post = decode_post(&row)?;
            post.apply(patch.clone())?;
            let encoded = EncodedPost::new(&post)?;

            let result = sqlx::query(
                r#"
                UPDATE posts
                SET status = ?, scheduled_at = ?, publish_results = ?, updated_at = ?,
                    revision = revision + 1
                WHERE id = ? AND revision = ?
                "#,
            )
            .bind(encoded.status)
            .bind(&encoded.scheduled_at)
            .bind(&encoded.publish_results)
            .bind(&encoded.updated_at)
            .bind(id)
            .bind(revision)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

            if result.rows_affected() == 1 {
                return Ok(post);
            }

            tracing::debug!(post_id = %id, "Post changed during update, retrying");
        }

        Err(StoreError::Database(format!(
            "Post {} kept changing, update abandoned",
            id
        )))
    }

    async fn delete_post(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosspost_domain::{
        GroupType, Platform, PlatformContent, PostContent, PublishResult, RedditContent,
        TwitterContent,
    };
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Arc;
    use time::macros::datetime;

    fn post(at: Option<OffsetDateTime>) -> Post {
        let platforms = BTreeSet::from([Platform::Twitter, Platform::Reddit]);
        let content = PostContent::new()
            .with(PlatformContent::Twitter(TwitterContent {
                text: "hello".to_string(),
                media_ids: vec!["m1".to_string()],
            }))
            .with(PlatformContent::Reddit(RedditContent {
                subreddit: "rust".to_string(),
                title: "Hello".to_string(),
                body: Some("World".to_string()),
                url: None,
                flair_id: None,
                nsfw: false,
            }));
        let created = datetime!(2024-01-01 00:00 UTC);
        match at {
            Some(at) => Post::scheduled(platforms, content, at, created).unwrap(),
            None => Post::new(platforms, content, created).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_post_roundtrip() {
        let store = SqlitePostStore::in_memory().await.unwrap();
        let mut post = post(Some(datetime!(2024-01-02 09:30 UTC)));
        post.campaign_id = Some("launch".to_string());
        post.group_id = Some("g1".to_string());
        post.group_type = Some(GroupType::PlatformVariants);

        store.create_post(&post).await.unwrap();
        let retrieved = store.get_post(&post.id).await.unwrap();

        assert_eq!(retrieved, Some(post));
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let store = SqlitePostStore::in_memory().await.unwrap();
        let post = post(None);
        store.create_post(&post).await.unwrap();

        assert!(matches!(
            store.create_post(&post).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_list_due_posts_filters_status_and_time() {
        let store = SqlitePostStore::in_memory().await.unwrap();
        let due = post(Some(datetime!(2024-01-01 00:00 UTC)));
        // Same instant in another offset still counts as due
        let due_offset = post(Some(datetime!(2024-01-01 02:00 +03:00)));
        let future = post(Some(datetime!(2024-01-02 00:00 UTC)));
        let draft = post(None);
        for p in [&due, &due_offset, &future, &draft] {
            store.create_post(p).await.unwrap();
        }

        let listed: Vec<String> = store
            .list_due_posts(datetime!(2024-01-01 00:00 UTC))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&due.id));
        assert!(listed.contains(&due_offset.id));
        assert_eq!(store.list_posts().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_update_post() {
        let store = SqlitePostStore::in_memory().await.unwrap();
        let post = post(Some(datetime!(2024-01-01 00:00 UTC)));
        store.create_post(&post).await.unwrap();

        let now = datetime!(2024-01-01 00:05 UTC);
        let results = BTreeMap::from([
            (
                Platform::Twitter,
                PublishResult::succeeded("1", "https://twitter.com/i/status/1", now),
            ),
            (Platform::Reddit, PublishResult::failed("Rate limited")),
        ]);
        let updated = store
            .update_post(
                &post.id,
                PostPatch::new(now)
                    .status(PostStatus::Failed)
                    .publish_results(results.clone()),
            )
            .await
            .unwrap();

        assert_eq!(updated.status, PostStatus::Failed);
        let stored = store.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.publish_results, results);
        assert_eq!(stored.updated_at, now);
    }

    #[tokio::test]
    async fn test_invalid_transition_leaves_row_untouched() {
        let store = SqlitePostStore::in_memory().await.unwrap();
        let post = post(None);
        store.create_post(&post).await.unwrap();

        let result = store
            .update_post(
                &post.id,
                PostPatch::new(datetime!(2024-01-05 00:00 UTC)).status(PostStatus::Failed),
            )
            .await;

        assert!(matches!(result, Err(StoreError::InvalidTransition(_))));
        assert_eq!(store.get_post(&post.id).await.unwrap(), Some(post));
    }

    #[tokio::test]
    async fn test_delete_post() {
        let store = SqlitePostStore::in_memory().await.unwrap();
        let post = post(None);
        store.create_post(&post).await.unwrap();

        assert!(store.delete_post(&post.id).await.unwrap());
        assert!(!store.delete_post(&post.id).await.unwrap());
        assert!(store.get_post(&post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("posts.db");
        let post = post(None);

        {
            let store = SqlitePostStore::new(&path).await.unwrap();
            store.create_post(&post).await.unwrap();
        }

        let reopened = SqlitePostStore::new(&path).await.unwrap();
        assert_eq!(reopened.get_post(&post.id).await.unwrap(), Some(post));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_on_file_store_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqlitePostStore::new(dir.path().join("posts.db")).await.unwrap());
        let mut ids = Vec::new();
        for _ in 0..40 {
            let post = post(Some(datetime!(2024-01-01 00:00 UTC)));
            store.create_post(&post).await.unwrap();
            ids.push(post.id);
        }

        let now = datetime!(2024-01-01 00:05 UTC);
        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .update_post(&id, PostPatch::new(now).status(PostStatus::Published))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let posts = store.list_posts().await.unwrap();
        assert_eq!(posts.len(), 40);
        assert!(posts.iter().all(|p| p.status == PostStatus::Published));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_updates_to_one_post_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqlitePostStore::new(dir.path().join("posts.db")).await.unwrap());
        let post = post(None);
        store.create_post(&post).await.unwrap();

        // draft <-> scheduled is always allowed, so every update must land
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let id = post.id.clone();
                let status = if i % 2 == 0 {
                    PostStatus::Scheduled
                } else {
                    PostStatus::Draft
                };
                tokio::spawn(async move {
                    store
                        .update_post(
                            &id,
                            PostPatch::new(datetime!(2024-01-02 00:00 UTC))
                                .status(status)
                                .scheduled_at(Some(datetime!(2024-02-01 00:00 UTC))),
                        )
                        .await
                })
            })
            .collect();

        let mut landed = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                landed += 1;
            }
        }
        assert!(landed > 0);

        let revision: i64 = sqlx::query_scalar("SELECT revision FROM posts WHERE id = ?")
            .bind(&post.id)
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(revision, landed);
    }
}
