//! Platform credential sets
//!
//! Resolved once when the orchestrator starts and handed to every publisher
//! call. A missing value leaves the platform unconfigured; publishers turn
//! that into a failure result instead of an error.

use secrecy::{ExposeSecret, SecretString};

use crate::model::Platform;

/// OAuth2 user-context token for the X API
#[derive(Debug, Clone, Default)]
pub struct TwitterCredentials {
    pub access_token: Option<SecretString>,
}

/// Member token plus the author URN shares are posted as
#[derive(Debug, Clone, Default)]
pub struct LinkedinCredentials {
    pub access_token: Option<SecretString>,
    /// e.g. `urn:li:person:abc123`
    pub author_urn: Option<String>,
}

/// OAuth token for a Reddit script/app account
#[derive(Debug, Clone, Default)]
pub struct RedditCredentials {
    pub access_token: Option<SecretString>,
    pub user_agent: Option<String>,
}

/// Complete Twitter credential set
#[derive(Debug, Clone, Copy)]
pub struct TwitterAuth<'a> {
    pub access_token: &'a SecretString,
}

/// Complete LinkedIn credential set
#[derive(Debug, Clone, Copy)]
pub struct LinkedinAuth<'a> {
    pub access_token: &'a SecretString,
    pub author_urn: &'a str,
}

/// Complete Reddit credential set
#[derive(Debug, Clone, Copy)]
pub struct RedditAuth<'a> {
    pub access_token: &'a SecretString,
    pub user_agent: &'a str,
}

fn present(secret: &Option<SecretString>) -> Option<&SecretString> {
    secret
        .as_ref()
        .filter(|s| !s.expose_secret().trim().is_empty())
}

fn present_str(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl TwitterCredentials {
    /// The credential set if every required value is present
    pub fn resolve(&self) -> Option<TwitterAuth<'_>> {
        Some(TwitterAuth {
            access_token: present(&self.access_token)?,
        })
    }
}

impl LinkedinCredentials {
    pub fn resolve(&self) -> Option<LinkedinAuth<'_>> {
        Some(LinkedinAuth {
            access_token: present(&self.access_token)?,
            author_urn: present_str(&self.author_urn)?,
        })
    }
}

impl RedditCredentials {
    pub fn resolve(&self) -> Option<RedditAuth<'_>> {
        Some(RedditAuth {
            access_token: present(&self.access_token)?,
            user_agent: present_str(&self.user_agent)?,
        })
    }
}

/// Credential sets for every platform
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub twitter: TwitterCredentials,
    pub linkedin: LinkedinCredentials,
    pub reddit: RedditCredentials,
}

impl Credentials {
    pub fn is_configured(&self, platform: Platform) -> bool {
        match platform {
            Platform::Twitter => self.twitter.resolve().is_some(),
            Platform::Linkedin => self.linkedin.resolve().is_some(),
            Platform::Reddit => self.reddit.resolve().is_some(),
        }
    }

    /// Every secret value held, for redacting error text
    pub fn secret_values(&self) -> Vec<&str> {
        [
            &self.twitter.access_token,
            &self.linkedin.access_token,
            &self.reddit.access_token,
        ]
        .into_iter()
        .filter_map(|s| present(s).map(|s| s.expose_secret()))
        .collect()
    }
}
