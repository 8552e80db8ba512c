//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::cache::CacheConfig;
use crate::domain::slug::ContentLayout;

pub use cli::{CliArgs, Command, ContentOverrides, PlanArgs, ServeArgs, ServeOverrides, SignArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "gitpress";
const ENV_PREFIX: &str = "GITPRESS";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_CONTENT_DIRECTORY: &str = "content";
const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FETCH_CONCURRENCY: usize = 8;
const DEFAULT_WEBHOOK_MAX_BODY_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub webhook: WebhookSettings,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Where posts live and how to reach them.
#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: Option<String>,
    pub layout: ContentLayout,
    pub api_base_url: Url,
    pub request_timeout: Duration,
    pub fetch_concurrency: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    /// Absent secret is not a load error; the webhook answers 500 instead.
    pub secret: Option<String>,
    pub max_body_bytes: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_content_overrides(&cli.content);
    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Plan(args)) => {
            if let Some(branch) = args.branch.as_ref() {
                raw.content.branch = Some(branch.clone());
            }
        }
        Some(Command::Sign(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    webhook: RawWebhookSettings,
    cache: CacheConfig,
}

impl RawSettings {
    fn apply_content_overrides(&mut self, overrides: &ContentOverrides) {
        if let Some(owner) = overrides.owner.as_ref() {
            self.content.owner = Some(owner.clone());
        }
        if let Some(repo) = overrides.repo.as_ref() {
            self.content.repo = Some(repo.clone());
        }
        if let Some(token) = overrides.token.as_ref() {
            self.content.token = Some(token.clone());
        }
        if let Some(branch) = overrides.branch.as_ref() {
            self.content.branch = Some(branch.clone());
        }
        if let Some(directory) = overrides.directory.as_ref() {
            self.content.directory = Some(directory.clone());
        }
        if let Some(secret) = overrides.webhook_secret.as_ref() {
            self.webhook.secret = Some(secret.clone());
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = enabled;
        }
        if let Some(eager) = overrides.cache_eager_refresh {
            self.cache.eager_refresh = eager;
        }
        if let Some(warm) = overrides.cache_warm_on_startup {
            self.cache.warm_on_startup = warm;
        }
        if let Some(limit) = overrides.webhook_max_body_bytes {
            self.webhook.max_body_bytes = Some(limit);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            webhook,
            cache,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let content = build_content_settings(content)?;
        let webhook = build_webhook_settings(webhook)?;

        Ok(Self {
            server,
            logging,
            content,
            webhook,
            cache,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let owner = non_blank(content.owner).ok_or_else(|| {
        LoadError::invalid(
            "content.owner",
            "repository owner is required (set GITHUB_REPO_OWNER)",
        )
    })?;
    let repo = non_blank(content.repo).ok_or_else(|| {
        LoadError::invalid(
            "content.repo",
            "repository name is required (set GITHUB_REPO_NAME)",
        )
    })?;
    let branch = non_blank(content.branch).unwrap_or_else(|| DEFAULT_BRANCH.to_string());
    let token = non_blank(content.token);

    let directory = content
        .directory
        .unwrap_or_else(|| DEFAULT_CONTENT_DIRECTORY.to_string());
    let layout = ContentLayout::new(&directory)
        .map_err(|err| LoadError::invalid("content.directory", err.to_string()))?;

    let raw_url = content
        .api_base_url
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let api_base_url = Url::parse(&raw_url)
        .map_err(|err| LoadError::invalid("content.api_base_url", err.to_string()))?;
    if api_base_url.cannot_be_a_base() {
        return Err(LoadError::invalid(
            "content.api_base_url",
            "must be an absolute http(s) URL",
        ));
    }

    let timeout_secs = content
        .request_timeout_seconds
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "content.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    let fetch_concurrency = non_zero_usize(
        content
            .fetch_concurrency
            .unwrap_or(DEFAULT_FETCH_CONCURRENCY as u64),
        "content.fetch_concurrency",
    )?;

    Ok(ContentSettings {
        owner,
        repo,
        branch,
        token,
        layout,
        api_base_url,
        request_timeout: Duration::from_secs(timeout_secs),
        fetch_concurrency,
    })
}

fn build_webhook_settings(webhook: RawWebhookSettings) -> Result<WebhookSettings, LoadError> {
    let max_body_bytes = non_zero_usize(
        webhook
            .max_body_bytes
            .unwrap_or(DEFAULT_WEBHOOK_MAX_BODY_BYTES),
        "webhook.max_body_bytes",
    )?;

    Ok(WebhookSettings {
        secret: non_blank(webhook.secret),
        max_body_bytes,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    owner: Option<String>,
    repo: Option<String>,
    branch: Option<String>,
    token: Option<String>,
    directory: Option<String>,
    api_base_url: Option<String>,
    request_timeout_seconds: Option<u64>,
    fetch_concurrency: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWebhookSettings {
    secret: Option<String>,
    max_body_bytes: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
