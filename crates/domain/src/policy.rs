//! Platform content constraints checked before anything is sent

use crate::model::{LinkedinContent, PlatformContent, RedditContent, TwitterContent};

pub const TWITTER_MAX_CHARS: usize = 280;
pub const LINKEDIN_MAX_CHARS: usize = 3000;
pub const REDDIT_TITLE_MAX_CHARS: usize = 300;

/// Content rejected by a platform constraint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("Content too long: {len} > {max}")]
    TooLong { len: usize, max: usize },
    #[error("Reddit posts take either a body or a url, not both")]
    BodyAndUrl,
}

/// Validate content against its platform's limits
pub fn validate_content(content: &PlatformContent) -> Result<(), PolicyViolation> {
    match content {
        PlatformContent::Twitter(c) => validate_twitter(c),
        PlatformContent::Linkedin(c) => validate_linkedin(c),
        PlatformContent::Reddit(c) => validate_reddit(c),
    }
}

fn validate_twitter(content: &TwitterContent) -> Result<(), PolicyViolation> {
    check_text("text", &content.text, TWITTER_MAX_CHARS)
}

fn validate_linkedin(content: &LinkedinContent) -> Result<(), PolicyViolation> {
    check_text("text", &content.text, LINKEDIN_MAX_CHARS)
}

fn validate_reddit(content: &RedditContent) -> Result<(), PolicyViolation> {
    if normalize_subreddit(&content.subreddit).is_empty() {
        return Err(PolicyViolation::Empty { field: "subreddit" });
    }
    check_text("title", &content.title, REDDIT_TITLE_MAX_CHARS)?;
    if content.body.is_some() && content.url.is_some() {
        return Err(PolicyViolation::BodyAndUrl);
    }
    Ok(())
}

fn check_text(field: &'static str, text: &str, max: usize) -> Result<(), PolicyViolation> {
    if text.trim().is_empty() {
        return Err(PolicyViolation::Empty { field });
    }
    // Platforms count characters, not bytes
    let len = text.chars().count();
    if len > max {
        return Err(PolicyViolation::TooLong { len, max });
    }
    Ok(())
}

/// Subreddit name without a leading `r/` or `/r/`
pub fn normalize_subreddit(name: &str) -> &str {
    let name = name.trim();
    let name = name.strip_prefix('/').unwrap_or(name);
    name.strip_prefix("r/").unwrap_or(name).trim()
}
