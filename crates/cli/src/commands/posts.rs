//! Posts command - create posts and move them through their lifecycle

use anyhow::{Context, Result, bail};
use crosspost_domain::{
    LinkedinContent, LinkedinVisibility, Platform, PlatformContent, Post, PostContent,
    PostStatus, PostStore, RedditContent, SystemClock, TwitterContent,
    policy::validate_content,
    usecases::PostLifecycle,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::args::{AddPostArgs, PostsArgs, PostsCommands};
use crate::commands::{format_time, open_store, parse_time};
use crate::config::AppConfig;

pub async fn execute(args: PostsArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let store = open_store(&config).await?;
    let lifecycle = PostLifecycle::new(Arc::clone(&store), Arc::new(SystemClock));

    match args.command {
        PostsCommands::List { status, json } => {
            let status = status
                .map(|s| s.parse::<PostStatus>())
                .transpose()
                .context("Invalid --status")?;
            let posts: Vec<Post> = store
                .list_posts()
                .await?
                .into_iter()
                .filter(|p| status.is_none_or(|s| p.status == s))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&posts)?);
            } else {
                print_posts(&posts);
            }
        }
        PostsCommands::Show { id } => {
            let post = store
                .get_post(&id)
                .await?
                .with_context(|| format!("Post not found: {}", id))?;
            println!("{}", serde_json::to_string_pretty(&post)?);
        }
        PostsCommands::Add(add) => {
            let post = build_post(add)?;
            store
                .create_post(&post)
                .await
                .context("Failed to save post")?;
            tracing::info!(post_id = %post.id, status = %post.status, "Post created");
            println!("{}", post.id);
        }
        PostsCommands::Status { id, status } => {
            let status: PostStatus = status.parse()?;
            let post = lifecycle.change_status(&id, status).await?;
            println!("{} {}", post.id, post.status);
        }
        PostsCommands::Schedule { id, at } => {
            let post = lifecycle.schedule(&id, parse_time(&at)?).await?;
            print_scheduled(&post);
        }
        PostsCommands::Republish { id, at } => {
            let post = lifecycle.republish(&id, parse_time(&at)?).await?;
            print_scheduled(&post);
        }
        PostsCommands::Archive { id } => {
            let post = lifecycle.archive(&id).await?;
            println!("{} {}", post.id, post.status);
        }
        PostsCommands::Restore { id } => {
            let post = lifecycle.restore(&id).await?;
            println!("{} {}", post.id, post.status);
        }
        PostsCommands::Delete { id } => {
            if !store.delete_post(&id).await? {
                bail!("Post not found: {}", id);
            }
            tracing::info!(post_id = %id, "Post deleted");
            println!("Deleted {}", id);
        }
    }

    Ok(())
}

fn build_post(args: AddPostArgs) -> Result<Post> {
    let mut content = match &args.content_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read content file: {}", path.display()))?;
            let entries: Vec<PlatformContent> = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid content file: {}", path.display()))?;
            PostContent::from(entries)
        }
        None => PostContent::new(),
    };

    if let Some(text) = args.twitter {
        content.insert(PlatformContent::Twitter(TwitterContent {
            text,
            media_ids: vec![],
        }));
    }

    if let Some(text) = args.linkedin {
        let visibility = match args.linkedin_visibility.trim().to_ascii_lowercase().as_str() {
            "public" => LinkedinVisibility::Public,
            "connections" => LinkedinVisibility::Connections,
            other => bail!("Invalid LinkedIn visibility: {}", other),
        };
        content.insert(PlatformContent::Linkedin(LinkedinContent {
            text,
            visibility,
            article_url: args.linkedin_article_url,
        }));
    }

    if let (Some(subreddit), Some(title)) = (args.reddit_subreddit, args.reddit_title) {
        content.insert(PlatformContent::Reddit(RedditContent {
            subreddit,
            title,
            body: args.reddit_body,
            url: args.reddit_url,
            flair_id: None,
            nsfw: false,
        }));
    }

    let platforms: BTreeSet<Platform> = if args.platforms.is_empty() {
        content.platforms().collect()
    } else {
        args.platforms
            .iter()
            .map(|p| p.parse::<Platform>())
            .collect::<Result<_, _>>()?
    };

    for platform in content.platforms() {
        if let Some(entry) = content.get(platform) {
            validate_content(entry)
                .with_context(|| format!("Invalid {} content", platform.display_name()))?;
        }
    }

    let now = time::OffsetDateTime::now_utc();
    let mut post = match args.at {
        Some(at) => Post::scheduled(platforms, content, parse_time(&at)?, now)?,
        None => Post::new(platforms, content, now)?,
    };
    post.campaign_id = args.campaign;
    Ok(post)
}

fn print_scheduled(post: &Post) {
    match post.scheduled_at {
        Some(at) => println!("{} {} {}", post.id, post.status, format_time(at)),
        None => println!("{} {}", post.id, post.status),
    }
}

fn print_posts(posts: &[Post]) {
    if posts.is_empty() {
        println!("No posts");
        return;
    }

    for post in posts {
        let scheduled = post
            .scheduled_at
            .map(format_time)
            .unwrap_or_else(|| "-".to_string());
        let platforms: Vec<String> = post
            .platforms
            .iter()
            .map(|platform| match post.publish_results.get(platform) {
                Some(r) if r.success => format!("{}:ok", platform),
                Some(_) => format!("{}:failed", platform),
                None => platform.to_string(),
            })
            .collect();
        println!(
            "{}  {:<9}  {:<20}  {}",
            post.id,
            post.status.as_str(),
            scheduled,
            platforms.join(",")
        );
    }
}
