use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the gitpress binary.
#[derive(Debug, Parser)]
#[command(
    name = "gitpress",
    version,
    about = "Serve blog posts from a GitHub repository with webhook-driven cache invalidation"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "GITPRESS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub content: ContentOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Print the cache tags a push payload would invalidate.
    Plan(PlanArgs),
    /// Print the signature header for a payload.
    Sign(SignArgs),
}

/// Content source identity; shared by every subcommand.
#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverrides {
    /// Owner of the repository holding the posts.
    #[arg(long = "github-owner", env = "GITHUB_REPO_OWNER", value_name = "OWNER")]
    pub owner: Option<String>,

    /// Name of the repository holding the posts.
    #[arg(long = "github-repo", env = "GITHUB_REPO_NAME", value_name = "REPO")]
    pub repo: Option<String>,

    /// Token used for GitHub API requests.
    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true
    )]
    pub token: Option<String>,

    /// Branch whose pushes are tracked and whose files are served.
    #[arg(long = "content-branch", env = "CONTENT_BRANCH", value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Directory of the repository holding `.mdx` posts.
    #[arg(long = "content-directory", value_name = "PATH")]
    pub directory: Option<String>,

    /// Shared secret for webhook signatures.
    #[arg(
        long = "webhook-secret",
        env = "GITHUB_WEBHOOK_SECRET",
        value_name = "SECRET",
        hide_env_values = true
    )]
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle the content cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Toggle background refresh after a webhook.
    #[arg(
        long = "cache-eager-refresh",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_eager_refresh: Option<bool>,

    /// Toggle loading every post at startup.
    #[arg(
        long = "cache-warm-on-startup",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_warm_on_startup: Option<bool>,

    /// Override the maximum webhook body size in bytes.
    #[arg(long = "webhook-max-body-bytes", value_name = "BYTES")]
    pub webhook_max_body_bytes: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct PlanArgs {
    /// JSON push payload.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Branch to treat as tracked instead of the configured one.
    #[arg(long, value_name = "BRANCH")]
    pub branch: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SignArgs {
    /// Payload to sign, byte for byte.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}
