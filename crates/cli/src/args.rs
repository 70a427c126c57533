//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// crosspost: publish scheduled posts to Twitter/X, LinkedIn and Reddit
#[derive(Parser, Debug)]
#[command(name = "crosspost")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish every post that is due
    Run(RunArgs),

    /// Create, inspect and move posts through their lifecycle
    Posts(PostsArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// List due posts without publishing or writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Keep running passes every poll interval until interrupted
    #[arg(long)]
    pub watch: bool,

    /// Print the pass summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PostsArgs {
    #[command(subcommand)]
    pub command: PostsCommands,
}

#[derive(Subcommand, Debug)]
pub enum PostsCommands {
    /// List stored posts
    List {
        /// Only posts with this status
        #[arg(long)]
        status: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one post as JSON
    Show { id: String },

    /// Create a post; prints the new id
    Add(AddPostArgs),

    /// Change a post's status
    Status { id: String, status: String },

    /// Schedule a post, keeping earlier per-platform results
    Schedule {
        id: String,

        /// RFC 3339 time, or "now"
        #[arg(long)]
        at: String,
    },

    /// Schedule a fresh attempt on every platform
    Republish {
        id: String,

        /// RFC 3339 time, or "now"
        #[arg(long, default_value = "now")]
        at: String,
    },

    /// Archive a post
    Archive { id: String },

    /// Bring an archived post back as a draft
    Restore { id: String },

    /// Permanently delete a post
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct AddPostArgs {
    /// Target platforms (defaults to the platforms given content)
    #[arg(long = "platform", value_delimiter = ',')]
    pub platforms: Vec<String>,

    /// Tweet text
    #[arg(long)]
    pub twitter: Option<String>,

    /// LinkedIn share text
    #[arg(long)]
    pub linkedin: Option<String>,

    /// LinkedIn visibility (public, connections)
    #[arg(long, default_value = "public")]
    pub linkedin_visibility: String,

    /// Article link attached to the LinkedIn share
    #[arg(long)]
    pub linkedin_article_url: Option<String>,

    /// Subreddit to submit to
    #[arg(long, requires = "reddit_title")]
    pub reddit_subreddit: Option<String>,

    /// Reddit submission title
    #[arg(long, requires = "reddit_subreddit")]
    pub reddit_title: Option<String>,

    /// Reddit self-post body
    #[arg(long, conflicts_with = "reddit_url")]
    pub reddit_body: Option<String>,

    /// Reddit link-post target
    #[arg(long)]
    pub reddit_url: Option<String>,

    /// JSON file holding a list of platform content entries
    #[arg(long)]
    pub content_file: Option<PathBuf>,

    /// Schedule for this RFC 3339 time (or "now"); otherwise a draft
    #[arg(long)]
    pub at: Option<String>,

    /// Campaign the post belongs to
    #[arg(long)]
    pub campaign: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
