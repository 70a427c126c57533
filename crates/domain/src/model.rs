//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::status::{PostStatus, TransitionError};

/// An external destination for content
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Linkedin,
    Reddit,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Twitter, Platform::Linkedin, Platform::Reddit];

    /// Wire name used in storage and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Reddit => "reddit",
        }
    }

    /// Human-readable name used in user-facing messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Twitter => "Twitter",
            Platform::Linkedin => "LinkedIn",
            Platform::Reddit => "Reddit",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" | "x" => Ok(Platform::Twitter),
            "linkedin" => Ok(Platform::Linkedin),
            "reddit" => Ok(Platform::Reddit),
            other => Err(PostError::UnknownPlatform(other.to_string())),
        }
    }
}

/// Visibility of a LinkedIn share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinkedinVisibility {
    #[default]
    Public,
    Connections,
}

/// Twitter/X post payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitterContent {
    pub text: String,
    /// Media ids previously uploaded by the media service
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_ids: Vec<String>,
}

/// LinkedIn share payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedinContent {
    pub text: String,
    #[serde(default)]
    pub visibility: LinkedinVisibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_url: Option<String>,
}

/// Reddit submission payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedditContent {
    pub subreddit: String,
    pub title: String,
    /// Self-post body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Link-post target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flair_id: Option<String>,
    #[serde(default)]
    pub nsfw: bool,
}

/// Platform-specific content, one variant per platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum PlatformContent {
    Twitter(TwitterContent),
    Linkedin(LinkedinContent),
    Reddit(RedditContent),
}

impl PlatformContent {
    pub fn platform(&self) -> Platform {
        match self {
            PlatformContent::Twitter(_) => Platform::Twitter,
            PlatformContent::Linkedin(_) => Platform::Linkedin,
            PlatformContent::Reddit(_) => Platform::Reddit,
        }
    }

    pub fn as_twitter(&self) -> Option<&TwitterContent> {
        match self {
            PlatformContent::Twitter(content) => Some(content),
            _ => None,
        }
    }

    pub fn as_linkedin(&self) -> Option<&LinkedinContent> {
        match self {
            PlatformContent::Linkedin(content) => Some(content),
            _ => None,
        }
    }

    pub fn as_reddit(&self) -> Option<&RedditContent> {
        match self {
            PlatformContent::Reddit(content) => Some(content),
            _ => None,
        }
    }
}

/// Content of a post keyed by the platform each variant belongs to.
///
/// Entries are always stored under their own variant's platform, so the
/// Twitter slot can only ever hold Twitter content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PlatformContent>", into = "Vec<PlatformContent>")]
pub struct PostContent {
    entries: BTreeMap<Platform, PlatformContent>,
}

impl PostContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert content, replacing any previous entry for the same platform
    pub fn insert(&mut self, content: PlatformContent) -> Option<PlatformContent> {
        self.entries.insert(content.platform(), content)
    }

    pub fn with(mut self, content: PlatformContent) -> Self {
        self.insert(content);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<&PlatformContent> {
        self.entries.get(&platform)
    }

    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<PlatformContent>> for PostContent {
    fn from(items: Vec<PlatformContent>) -> Self {
        let mut content = PostContent::new();
        for item in items {
            content.insert(item);
        }
        content
    }
}

impl From<PostContent> for Vec<PlatformContent> {
    fn from(content: PostContent) -> Self {
        content.entries.into_values().collect()
    }
}

/// Outcome of one publish attempt on one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<OffsetDateTime>,
}

impl PublishResult {
    /// A successful attempt with the remote identifiers
    pub fn succeeded(
        post_id: impl Into<String>,
        post_url: impl Into<String>,
        published_at: OffsetDateTime,
    ) -> Self {
        Self {
            success: true,
            post_id: Some(post_id.into()),
            post_url: Some(post_url.into()),
            error: None,
            published_at: Some(published_at),
        }
    }

    /// A failed attempt with a human-readable reason
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            post_id: None,
            post_url: None,
            error: Some(error.into()),
            published_at: None,
        }
    }
}

/// Per-platform outcomes of the latest attempt(s) on a post
pub type PublishResults = BTreeMap<Platform, PublishResult>;

/// How grouped posts relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    /// Same idea submitted to several subreddits
    SubredditCrosspost,
    /// Variants of one idea across platforms
    PlatformVariants,
    /// Ordered series of posts
    Thread,
}

/// The unit of schedulable content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub status: PostStatus,
    pub platforms: BTreeSet<Platform>,
    pub content: PostContent,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub publish_results: PublishResults,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<GroupType>,
}

impl Post {
    /// Create a draft post with a freshly generated id
    pub fn new(
        platforms: BTreeSet<Platform>,
        content: PostContent,
        now: OffsetDateTime,
    ) -> Result<Self, PostError> {
        if platforms.is_empty() {
            return Err(PostError::NoPlatforms);
        }

        if let Some(stray) = content.platforms().find(|p| !platforms.contains(p)) {
            return Err(PostError::UntargetedContent(stray));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            status: PostStatus::Draft,
            platforms,
            content,
            publish_results: PublishResults::new(),
            scheduled_at: None,
            created_at: now,
            updated_at: now,
            campaign_id: None,
            group_id: None,
            group_type: None,
        })
    }

    /// Create a post that is already scheduled for `at`
    pub fn scheduled(
        platforms: BTreeSet<Platform>,
        content: PostContent,
        at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<Self, PostError> {
        let mut post = Self::new(platforms, content, now)?;
        post.status = PostStatus::Scheduled;
        post.scheduled_at = Some(at);
        Ok(post)
    }

    /// Content for a targeted platform; never returns content for a platform
    /// outside `platforms`
    pub fn content_for(&self, platform: Platform) -> Option<&PlatformContent> {
        if self.platforms.contains(&platform) {
            self.content.get(platform)
        } else {
            None
        }
    }

    /// Targeted platforms that do not yet hold a successful result
    pub fn pending_platforms(&self) -> Vec<Platform> {
        self.platforms
            .iter()
            .copied()
            .filter(|p| !self.publish_results.get(p).is_some_and(|r| r.success))
            .collect()
    }

    /// Whether every targeted platform holds a successful result
    pub fn all_platforms_succeeded(&self) -> bool {
        !self.platforms.is_empty() && self.pending_platforms().is_empty()
    }

    /// Apply a partial update, validating any status change first.
    ///
    /// On error the post is left untouched.
    pub fn apply(&mut self, patch: PostPatch) -> Result<(), TransitionError> {
        let next_status = patch.status.unwrap_or(self.status);
        self.status.validate_transition(next_status)?;

        self.status = next_status;
        if let Some(scheduled_at) = patch.scheduled_at {
            self.scheduled_at = scheduled_at;
        }
        if next_status == PostStatus::Draft {
            self.scheduled_at = None;
        }
        if let Some(results) = patch.publish_results {
            self.publish_results = results;
        }
        self.updated_at = patch.updated_at;
        Ok(())
    }
}

/// Partial update of a post record
#[derive(Debug, Clone, PartialEq)]
pub struct PostPatch {
    pub status: Option<PostStatus>,
    /// `Some(None)` clears the schedule
    pub scheduled_at: Option<Option<OffsetDateTime>>,
    /// Replaces the whole result map when set
    pub publish_results: Option<PublishResults>,
    pub updated_at: OffsetDateTime,
}

impl PostPatch {
    pub fn new(updated_at: OffsetDateTime) -> Self {
        Self {
            status: None,
            scheduled_at: None,
            publish_results: None,
            updated_at,
        }
    }

    pub fn status(mut self, status: PostStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn scheduled_at(mut self, scheduled_at: Option<OffsetDateTime>) -> Self {
        self.scheduled_at = Some(scheduled_at);
        self
    }

    pub fn publish_results(mut self, results: PublishResults) -> Self {
        self.publish_results = Some(results);
        self
    }
}

/// Errors building or parsing post data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostError {
    #[error("A post must target at least one platform")]
    NoPlatforms,
    #[error("Content provided for {0}, which the post does not target")]
    UntargetedContent(Platform),
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),
}
