//! Doctor command - validate configuration and show status

use anyhow::Result;
use crosspost_domain::{Credentials, Platform, PostStatus, PostStore};
use serde::Serialize;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::commands::{load_credentials, open_store};
use crate::config::{AppConfig, PublishMode};

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    store: CheckResult,
    twitter: CheckResult,
    linkedin: CheckResult,
    reddit: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        store: CheckResult::error("Not checked"),
        twitter: CheckResult::error("Not checked"),
        linkedin: CheckResult::error("Not checked"),
        reddit: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok(format!(
                "Configuration loaded, mode: {:?}",
                c.publishing.mode
            ));
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.store = check_store(config).await;

        let credentials = load_credentials(config);
        report.twitter = check_platform(
            config,
            &credentials,
            Platform::Twitter,
            &[config.twitter.access_token_env.as_str()],
        );
        report.linkedin = check_platform(
            config,
            &credentials,
            Platform::Linkedin,
            &[
                config.linkedin.access_token_env.as_str(),
                config.linkedin.author_urn_env.as_str(),
            ],
        );
        report.reddit = check_platform(
            config,
            &credentials,
            Platform::Reddit,
            &[config.reddit.access_token_env.as_str()],
        );
    }

    // Determine overall status
    let checks = [
        &report.config,
        &report.store,
        &report.twitter,
        &report.linkedin,
        &report.reddit,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_store(config: &AppConfig) -> CheckResult {
    let store = match open_store(config).await {
        Ok(s) => s,
        Err(e) => return CheckResult::error(format!("{:#}", e)),
    };

    match store.list_posts().await {
        Ok(posts) => {
            let count = |status: PostStatus| posts.iter().filter(|p| p.status == status).count();
            CheckResult::ok(format!(
                "{} posts in {}",
                posts.len(),
                config.general.store_path.display()
            ))
            .with_details(serde_json::json!({
                "total": posts.len(),
                "scheduled": count(PostStatus::Scheduled),
                "failed": count(PostStatus::Failed),
            }))
        }
        Err(e) => CheckResult::error(format!("Failed to read posts: {}", e)),
    }
}

fn check_platform(
    config: &AppConfig,
    credentials: &Credentials,
    platform: Platform,
    env_vars: &[&str],
) -> CheckResult {
    if config.publishing.mode == PublishMode::Stub {
        return CheckResult::ok("Stub publisher (offline)");
    }

    if env_vars.iter().any(|v| v.trim().is_empty()) {
        return CheckResult::error(format!(
            "No credential env var configured for {}",
            platform.display_name()
        ));
    }

    // Report variable names only, never their values
    if credentials.is_configured(platform) {
        CheckResult::ok(format!("Credentials: {} (set)", env_vars.join(", ")))
    } else {
        CheckResult::warn(format!(
            "Credentials: {} (not set), posts for {} will fail",
            env_vars.join(", "),
            platform.display_name()
        ))
    }
}

fn print_report(report: &DoctorReport) {
    println!("crosspost Doctor Report");
    println!("=======================");
    println!();

    print_check("Config", &report.config);
    print_check("Post store", &report.store);
    print_check("Twitter", &report.twitter);
    print_check("LinkedIn", &report.linkedin);
    print_check("Reddit", &report.reddit);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: crosspost run --dry-run");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
