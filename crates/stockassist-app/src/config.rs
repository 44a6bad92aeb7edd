//! Application configuration.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use stockassist_chat::{ChatConfig, PollConfig};
use stockassist_suggest::SuggestConfig;
use stockassist_ws::ConnectionConfig;
use url::Url;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "STOCKASSIST_CONFIG";
/// Config file used when neither the CLI nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server origin for REST calls, e.g. `https://stockassist.example`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Raw `Cookie` header sent with every REST call.
    #[serde(default)]
    pub session_cookie: Option<String>,
    #[serde(default)]
    pub websocket: WsConfig,
    #[serde(default)]
    pub chat: ChatSection,
    #[serde(default)]
    pub suggest: SuggestSection,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session_cookie: None,
            websocket: WsConfig::default(),
            chat: ChatSection::default(),
            suggest: SuggestSection::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Push channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    /// Full socket URL; derived from `base_url` when unset.
    #[serde(default)]
    pub url: Option<String>,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Slack after a missed server ping before the socket is dropped.
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    5000
}

fn default_heartbeat_timeout_ms() -> u64 {
    20_000
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

impl From<WsConfig> for ConnectionConfig {
    fn from(cfg: WsConfig) -> Self {
        Self {
            url: cfg.url.unwrap_or_default(), // Resolved in AppConfig::socket_url
            max_reconnect_attempts: cfg.max_reconnect_attempts,
            reconnect_base_delay_ms: cfg.reconnect_base_delay_ms,
            reconnect_max_delay_ms: cfg.reconnect_max_delay_ms,
            heartbeat_timeout_ms: cfg.heartbeat_timeout_ms,
            ..ConnectionConfig::default()
        }
    }
}

/// Chat coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSection {
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
    #[serde(default = "default_max_images_per_message")]
    pub max_images_per_message: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_error_interval_ms")]
    pub poll_error_interval_ms: u64,
    /// Consecutive poll failures before polling stops (0 = never).
    #[serde(default = "default_max_poll_errors")]
    pub max_poll_errors: u32,
    #[serde(default = "default_chat_list_refresh_delay_ms")]
    pub chat_list_refresh_delay_ms: u64,
}

fn default_token_budget() -> usize {
    stockassist_core::tokens::DEFAULT_TOKEN_BUDGET
}

fn default_max_images_per_message() -> usize {
    1
}

fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_poll_error_interval_ms() -> u64 {
    3000
}

fn default_max_poll_errors() -> u32 {
    20
}

fn default_chat_list_refresh_delay_ms() -> u64 {
    150
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            max_images_per_message: default_max_images_per_message(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_error_interval_ms: default_poll_error_interval_ms(),
            max_poll_errors: default_max_poll_errors(),
            chat_list_refresh_delay_ms: default_chat_list_refresh_delay_ms(),
        }
    }
}

impl From<ChatSection> for ChatConfig {
    fn from(cfg: ChatSection) -> Self {
        Self {
            token_budget: cfg.token_budget,
            max_images_per_message: cfg.max_images_per_message,
            chat_list_refresh_delay_ms: cfg.chat_list_refresh_delay_ms,
            poll: PollConfig {
                interval_ms: cfg.poll_interval_ms,
                error_interval_ms: cfg.poll_error_interval_ms,
                max_consecutive_errors: cfg.max_poll_errors,
            },
        }
    }
}

/// Suggestion dropdown settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestSection {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for SuggestSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl From<SuggestSection> for SuggestConfig {
    fn from(cfg: SuggestSection) -> Self {
        Self {
            debounce_ms: cfg.debounce_ms,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    stockassist_telemetry::DEFAULT_FILTER.to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `STOCKASSIST_CONFIG` or the default path,
    /// falling back to defaults when the file does not exist.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| AppError::Config(format!("Invalid base_url '{}': {e}", self.base_url)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "base_url must be http(s), got '{}'",
                base.scheme()
            )));
        }
        if self.chat.token_budget == 0 {
            return Err(AppError::Config("chat.token_budget must be positive".to_string()));
        }
        if self.websocket.reconnect_base_delay_ms > self.websocket.reconnect_max_delay_ms {
            return Err(AppError::Config(
                "websocket.reconnect_base_delay_ms exceeds reconnect_max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Push channel URL: the explicit override, else derived from `base_url`.
    pub fn socket_url(&self) -> AppResult<String> {
        match &self.websocket.url {
            Some(url) => Ok(url.clone()),
            None => Ok(stockassist_ws::socket_url(&self.base_url)?),
        }
    }

    /// Connection settings with the URL resolved and the session cookie
    /// carried onto the upgrade request.
    pub fn connection_config(&self) -> AppResult<ConnectionConfig> {
        let mut ws_config: ConnectionConfig = self.websocket.clone().into();
        ws_config.url = self.socket_url()?;
        ws_config.cookie = self.session_cookie.clone();
        Ok(ws_config)
    }
}
