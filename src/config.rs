use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::UserId;
use url::Url;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// Users granted admin rights at startup
    admin_ids: Vec<u64>,
    /// Directory for the database and logs. Defaults to current directory.
    data_dir: Option<String>,
    #[serde(default = "default_database_file")]
    database_file: String,
    #[serde(default = "default_broadcast_delay_ms")]
    broadcast_delay_ms: u64,
    /// Receive updates over HTTP instead of long polling.
    webhook: Option<WebhookFile>,
}

#[derive(Deserialize)]
struct WebhookFile {
    /// Public base URL, e.g. "https://my-bot.onrender.com"
    url: String,
    #[serde(default = "default_listen_addr")]
    listen_addr: String,
}

fn default_database_file() -> String {
    "tournament.db".to_string()
}

fn default_broadcast_delay_ms() -> u64 {
    50
}

fn default_listen_addr() -> String {
    "0.0.0.0:8443".to_string()
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: Url,
    pub listen_addr: SocketAddr,
}

impl WebhookConfig {
    /// The URL Telegram posts to: the base URL with the bot token as last path segment.
    pub fn endpoint(&self, token: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}/{}", self.url.as_str().trim_end_matches('/'), token))
    }
}

pub struct Config {
    /// Path to the config file
    pub config_path: PathBuf,
    pub telegram_bot_token: String,
    pub admin_ids: Vec<UserId>,
    /// Directory for state files (database, logs).
    pub data_dir: PathBuf,
    pub database_file: String,
    /// Pause between messages when sending to many users.
    pub broadcast_delay: Duration,
    pub webhook: Option<WebhookConfig>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        if file.admin_ids.is_empty() {
            return Err(ConfigError::Validation("admin_ids must contain at least one admin ID".into()));
        }
        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.database_file.trim().is_empty() {
            return Err(ConfigError::Validation("database_file must not be empty".into()));
        }

        let webhook = file.webhook.map(parse_webhook).transpose()?;

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            config_path,
            telegram_bot_token: file.telegram_bot_token,
            admin_ids: file.admin_ids.into_iter().map(UserId).collect(),
            data_dir,
            database_file: file.database_file,
            broadcast_delay: Duration::from_millis(file.broadcast_delay_ms),
            webhook,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn parse_webhook(file: WebhookFile) -> Result<WebhookConfig, ConfigError> {
    let url = Url::parse(&file.url)
        .map_err(|e| ConfigError::Validation(format!("webhook.url '{}' is invalid: {}", file.url, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!("webhook.url must be http or https, got '{}'", url.scheme())));
    }
    let listen_addr = file
        .listen_addr
        .parse()
        .map_err(|e| ConfigError::Validation(format!("webhook.listen_addr '{}' is invalid: {}", file.listen_addr, e)))?;
    Ok(WebhookConfig { url, listen_addr })
}
