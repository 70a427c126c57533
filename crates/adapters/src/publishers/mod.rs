//! Platform publisher adapters

mod linkedin;
mod reddit;
mod stub;
mod twitter;

pub use linkedin::LinkedinPublisher;
pub use reddit::RedditPublisher;
pub use stub::StubPublisher;
pub use twitter::TwitterPublisher;

use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error text kept in a publish result
const MAX_ERROR_CHARS: usize = 300;

pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|error| {
            tracing::warn!(error = %error, "Falling back to default HTTP client");
            Client::new()
        })
}

/// Strip secret values from text headed for a publish result and cap its
/// length
pub(crate) fn redact(message: &str, secrets: &[&str]) -> String {
    let mut cleaned = message.trim().to_string();
    for secret in secrets.iter().filter(|s| !s.is_empty()) {
        cleaned = cleaned.replace(secret, "[redacted]");
    }

    if cleaned.chars().count() > MAX_ERROR_CHARS {
        let truncated: String = cleaned.chars().take(MAX_ERROR_CHARS).collect();
        format!("{}...", truncated)
    } else {
        cleaned
    }
}

/// Response body for an error message; empty bodies fall back to the status
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body)
    }
}
