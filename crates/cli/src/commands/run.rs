//! Run command - publish every due post

use anyhow::{Context, Result};
use crosspost_domain::{
    Clock, SystemClock,
    usecases::{PublishPass, PublishPassConfig, RunSummary},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

use crate::args::RunArgs;
use crate::commands::{build_publishers, load_credentials, open_store};
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let dry_run = args.dry_run || config.general.dry_run;

    tracing::info!(
        dry_run = dry_run,
        watch = args.watch,
        mode = ?config.publishing.mode,
        store = %config.general.store_path.display(),
        "Starting crosspost run"
    );

    let store = open_store(&config).await?;
    let credentials = Arc::new(load_credentials(&config));
    let publishers = build_publishers(&config);
    let clock = Arc::new(SystemClock);

    let pass = PublishPass::new(
        store,
        publishers,
        credentials,
        Arc::clone(&clock),
        PublishPassConfig {
            dry_run,
            max_concurrent_posts: config.general.max_concurrent_posts,
            rate_limit_per_minute: config.rate_limit_per_minute(),
            rate_limit_per_hour: config.rate_limit_per_hour(),
        },
    );

    // Ctrl+C stops new dispatches; in-flight posts finish and are written
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let shutdown = || {
        let mut rx = shutdown_rx.clone();
        async move {
            let _ = rx.wait_for(|stop| *stop).await;
        }
    };

    if !args.watch {
        let summary = pass
            .run_until(clock.now(), shutdown())
            .await
            .context("Publish pass failed")?;
        print_summary(&summary, args.json)?;
        return Ok(());
    }

    let poll_interval = Duration::from_secs(config.general.poll_interval_secs.max(1));
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let stop = shutdown();
    tokio::pin!(stop);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => {
                tracing::info!("Shutting down gracefully");
                break;
            }
            _ = ticker.tick() => {
                match pass.run_until(clock.now(), shutdown()).await {
                    Ok(summary) => print_summary(&summary, args.json)?,
                    Err(e) => {
                        tracing::error!(error = %e, "Publish pass failed");
                    }
                }
            }
        }
    }

    tracing::info!("crosspost run completed");
    Ok(())
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("{}", summary);
    for outcome in &summary.outcomes {
        let failed = outcome.failed_platforms();
        if failed.is_empty() {
            println!("  {} {}", outcome.post_id, outcome.status);
        } else {
            println!(
                "  {} {} (failed: {})",
                outcome.post_id,
                outcome.status,
                failed.join(", ")
            );
        }
        if !outcome.persisted {
            println!("  {} not saved, will retry next run", outcome.post_id);
        }
    }
    Ok(())
}
