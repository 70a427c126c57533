//! Command implementations and the wiring they share

pub mod config;
pub mod doctor;
pub mod posts;
pub mod run;

use anyhow::{Context, Result};
use crosspost_adapters::publishers::{
    LinkedinPublisher, RedditPublisher, StubPublisher, TwitterPublisher,
};
use crosspost_adapters::store::SqlitePostStore;
use crosspost_domain::{
    Credentials, LinkedinCredentials, Platform, RedditCredentials, TwitterCredentials,
    usecases::Publishers,
};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::config::{AppConfig, PublishMode};

/// Open the configured SQLite post store
pub async fn open_store(config: &AppConfig) -> Result<Arc<SqlitePostStore>> {
    let store = SqlitePostStore::new(&config.general.store_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open post store: {}",
                config.general.store_path.display()
            )
        })?;
    Ok(Arc::new(store))
}

/// Read an environment variable, treating unset and blank the same
fn env_value(name: &str) -> Option<String> {
    if name.trim().is_empty() {
        return None;
    }
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_secret(name: &str) -> Option<SecretString> {
    env_value(name).map(SecretString::from)
}

/// Resolve every platform's credentials once. Missing variables leave that
/// platform unconfigured.
pub fn load_credentials(config: &AppConfig) -> Credentials {
    let user_agent = Some(config.reddit.user_agent.trim().to_string()).filter(|ua| !ua.is_empty());

    Credentials {
        twitter: TwitterCredentials {
            access_token: env_secret(&config.twitter.access_token_env),
        },
        linkedin: LinkedinCredentials {
            access_token: env_secret(&config.linkedin.access_token_env),
            author_urn: env_value(&config.linkedin.author_urn_env),
        },
        reddit: RedditCredentials {
            access_token: env_secret(&config.reddit.access_token_env),
            user_agent,
        },
    }
}

/// Publisher registry for the configured mode
pub fn build_publishers(config: &AppConfig) -> Publishers {
    match config.publishing.mode {
        PublishMode::Stub => Platform::ALL
            .into_iter()
            .fold(Publishers::new(), |publishers, platform| {
                publishers.with(Arc::new(StubPublisher::new(platform)))
            }),
        PublishMode::Live => {
            let timeout = Duration::from_secs(config.http.timeout_secs);
            Publishers::new()
                .with(Arc::new(TwitterPublisher::with_base_url(
                    config.twitter.base_url.clone(),
                    timeout,
                )))
                .with(Arc::new(LinkedinPublisher::with_base_url(
                    config.linkedin.base_url.clone(),
                    timeout,
                )))
                .with(Arc::new(RedditPublisher::with_base_url(
                    config.reddit.base_url.clone(),
                    timeout,
                )))
        }
    }
}

/// Parse an RFC 3339 time; `now` means the current time
pub fn parse_time(value: &str) -> Result<OffsetDateTime> {
    if value.trim().eq_ignore_ascii_case("now") {
        return Ok(OffsetDateTime::now_utc());
    }
    OffsetDateTime::parse(value.trim(), &Rfc3339)
        .with_context(|| format!("Invalid time (expected RFC 3339 or \"now\"): {}", value))
}

pub fn format_time(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.to_string())
}
