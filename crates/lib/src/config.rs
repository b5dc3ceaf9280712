//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.bpbridge/config.json`) and environment.
//! Secrets and the webhook URL are usually supplied via env (or a `.env` file in the
//! working directory) rather than written into the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Inbound HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Botpress webhook and chat API settings.
    #[serde(default)]
    pub botpress: BotpressConfig,
}

/// Gateway bind, port, and CORS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the HTTP API (default 50000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,

    /// Origins allowed to call `/api/*` from a browser.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_gateway_port() -> u16 {
    50000
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["https://studio.botpress.cloud".to_string()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Outbound message body layout. Botpress integrations disagree on where the
/// conversation id and user id live, so this is selectable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayloadShape {
    /// `{ conversationId, payload: { message, userId, type, text, metadata } }`
    #[default]
    Nested,

    /// `{ message, conversationId, userId, payload: { type, text, metadata } }`
    Flat,
}

/// Botpress endpoints, identities and outbound request options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotpressConfig {
    /// Webhook URL messages are posted to. Overridden by BOTPRESS_WEBHOOK_URL env.
    pub webhook_url: Option<String>,

    /// Bot id (sent as `x-bot-id` to the chat API). Overridden by BOTPRESS_BOT_ID env.
    pub bot_id: Option<String>,

    /// User id placed in outbound payloads when the caller does not supply one.
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Conversation id used when an inbound request omits `conversationId`.
    #[serde(default = "default_conversation_id")]
    pub default_conversation_id: String,

    #[serde(default)]
    pub payload_shape: PayloadShape,

    /// Timeout for webhook requests. Unset means wait indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Base URL of the Botpress cloud API (conversation creation).
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Base URL of the Botpress chat integration (user creation).
    #[serde(default = "default_chat_base")]
    pub chat_base: String,

    /// Personal access token for the cloud API. Overridden by BOTPRESS_TOKEN env.
    pub token: Option<String>,

    /// Chat integration secret (`x-bp-secret`). Overridden by BOTPRESS_WEBHOOK_SECRET env.
    pub webhook_secret: Option<String>,
}

fn default_user_id() -> String {
    "simulator_user".to_string()
}

fn default_conversation_id() -> String {
    "default_conversation".to_string()
}

fn default_api_base() -> String {
    "https://api.botpress.cloud".to_string()
}

fn default_chat_base() -> String {
    "https://chat.botpress.cloud".to_string()
}

impl Default for BotpressConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            bot_id: None,
            user_id: default_user_id(),
            default_conversation_id: default_conversation_id(),
            payload_shape: PayloadShape::default(),
            request_timeout_secs: None,
            api_base: default_api_base(),
            chat_base: default_chat_base(),
            token: None,
            webhook_secret: None,
        }
    }
}

impl BotpressConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}

/// Read a non-empty, trimmed env var.
fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn config_non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the webhook URL: env BOTPRESS_WEBHOOK_URL overrides config.
pub fn resolve_webhook_url(config: &Config) -> Option<String> {
    env_non_empty("BOTPRESS_WEBHOOK_URL").or_else(|| config_non_empty(&config.botpress.webhook_url))
}

/// Resolve the bot id: env BOTPRESS_BOT_ID overrides config.
pub fn resolve_bot_id(config: &Config) -> Option<String> {
    env_non_empty("BOTPRESS_BOT_ID").or_else(|| config_non_empty(&config.botpress.bot_id))
}

/// Resolve the cloud API token: env BOTPRESS_TOKEN overrides config.
pub fn resolve_token(config: &Config) -> Option<String> {
    env_non_empty("BOTPRESS_TOKEN").or_else(|| config_non_empty(&config.botpress.token))
}

/// Resolve the chat integration secret: env BOTPRESS_WEBHOOK_SECRET overrides config.
pub fn resolve_webhook_secret(config: &Config) -> Option<String> {
    env_non_empty("BOTPRESS_WEBHOOK_SECRET")
        .or_else(|| config_non_empty(&config.botpress.webhook_secret))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("BPBRIDGE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".bpbridge").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load `.env` from the working directory (if any), then the config file.
/// Missing file => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    if let Ok(env_path) = dotenvy::dotenv() {
        log::debug!("loaded environment from {}", env_path.display());
    }
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
