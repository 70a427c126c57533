//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub publishing: PublishingConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub twitter: TwitterConfig,

    #[serde(default)]
    pub linkedin: LinkedinConfig,

    #[serde(default)]
    pub reddit: RedditConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default = "default_max_concurrent_posts")]
    pub max_concurrent_posts: usize,

    #[serde(default)]
    pub rate_limit_per_minute: u32,

    #[serde(default)]
    pub rate_limit_per_hour: u32,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

/// Where posts are sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    /// Real platform APIs
    #[default]
    Live,
    /// Offline publishers that accept everything
    Stub,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishingConfig {
    #[serde(default)]
    pub mode: PublishMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    #[serde(default = "default_twitter_base_url")]
    pub base_url: String,

    #[serde(default = "default_twitter_access_token_env")]
    pub access_token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedinConfig {
    #[serde(default = "default_linkedin_base_url")]
    pub base_url: String,

    #[serde(default = "default_linkedin_access_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_linkedin_author_urn_env")]
    pub author_urn_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default = "default_reddit_base_url")]
    pub base_url: String,

    #[serde(default = "default_reddit_access_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_reddit_user_agent")]
    pub user_agent: String,
}

// Default value functions
fn default_store_path() -> PathBuf {
    PathBuf::from("./crosspost.sqlite")
}

fn default_max_concurrent_posts() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    60
}

fn default_timeout() -> u64 {
    30
}

fn default_twitter_base_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_twitter_access_token_env() -> String {
    "TWITTER_ACCESS_TOKEN".to_string()
}

fn default_linkedin_base_url() -> String {
    "https://api.linkedin.com".to_string()
}

fn default_linkedin_access_token_env() -> String {
    "LINKEDIN_ACCESS_TOKEN".to_string()
}

fn default_linkedin_author_urn_env() -> String {
    "LINKEDIN_AUTHOR_URN".to_string()
}

fn default_reddit_base_url() -> String {
    "https://oauth.reddit.com".to_string()
}

fn default_reddit_access_token_env() -> String {
    "REDDIT_ACCESS_TOKEN".to_string()
}

fn default_reddit_user_agent() -> String {
    format!("crosspost/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            dry_run: false,
            max_concurrent_posts: default_max_concurrent_posts(),
            rate_limit_per_minute: 0,
            rate_limit_per_hour: 0,
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            base_url: default_twitter_base_url(),
            access_token_env: default_twitter_access_token_env(),
        }
    }
}

impl Default for LinkedinConfig {
    fn default() -> Self {
        Self {
            base_url: default_linkedin_base_url(),
            access_token_env: default_linkedin_access_token_env(),
            author_urn_env: default_linkedin_author_urn_env(),
        }
    }
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: default_reddit_base_url(),
            access_token_env: default_reddit_access_token_env(),
            user_agent: default_reddit_user_agent(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("CROSSPOST")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// 0 in the file means unlimited
    pub fn rate_limit_per_minute(&self) -> Option<u32> {
        rate_limit_from_config(self.general.rate_limit_per_minute)
    }

    pub fn rate_limit_per_hour(&self) -> Option<u32> {
        rate_limit_from_config(self.general.rate_limit_per_hour)
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# crosspost configuration
#
# Secrets never live in this file. Each platform section names the
# environment variables that hold them.

[general]
store_path = "./crosspost.sqlite"
dry_run = false
max_concurrent_posts = 4
# 0 disables rate limiting
rate_limit_per_minute = 0
rate_limit_per_hour = 0
# Used by `crosspost run --watch`
poll_interval_secs = 60

[publishing]
mode = "live"  # live, stub

[http]
timeout_secs = 30

[twitter]
base_url = "https://api.twitter.com"
access_token_env = "TWITTER_ACCESS_TOKEN"

[linkedin]
base_url = "https://api.linkedin.com"
access_token_env = "LINKEDIN_ACCESS_TOKEN"
author_urn_env = "LINKEDIN_AUTHOR_URN"

[reddit]
base_url = "https://oauth.reddit.com"
access_token_env = "REDDIT_ACCESS_TOKEN"
user_agent = "crosspost/0.1 (by /u/your_username)"
"#
        .to_string()
    }
}

fn rate_limit_from_config(value: u32) -> Option<u32> {
    if value == 0 { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_toml_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert_eq!(config.publishing.mode, PublishMode::Live);
        assert_eq!(config.general.max_concurrent_posts, 4);
        assert_eq!(config.linkedin.author_urn_env, "LINKEDIN_AUTHOR_URN");
        assert_eq!(config.rate_limit_per_minute(), None);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: AppConfig = toml::from_str("[publishing]\nmode = \"stub\"\n").unwrap();
        assert_eq!(config.publishing.mode, PublishMode::Stub);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.twitter.access_token_env, "TWITTER_ACCESS_TOKEN");
        assert!(!config.general.dry_run);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(result.is_err());
    }
}
