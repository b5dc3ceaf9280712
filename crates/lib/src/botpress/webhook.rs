//! Webhook client: POST one message, read one reply.

use crate::botpress::payload::{parse_reply, MessagePayload, WebhookReply};
use crate::config::{self, Config, PayloadShape};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Duration;

/// Why a single webhook send failed. Display text is what the operator sees in place of a reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Error: Botpress returned status code {0}")]
    HttpStatus(u16),
    #[error("Error: Empty response from Botpress")]
    EmptyBody,
    #[error("Invalid JSON response: {0}")]
    Decode(String),
}

/// Sends a message to the chat platform and returns its reply.
#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn send(&self, payload: &MessagePayload) -> Result<WebhookReply, RelayError>;
}

/// reqwest-backed webhook client. No retries; one request per send.
#[derive(Clone)]
pub struct WebhookClient {
    url: String,
    shape: PayloadShape,
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new(
        url: impl Into<String>,
        shape: PayloadShape,
        timeout: Option<Duration>,
    ) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            url: url.into(),
            shape,
            client: builder.build()?,
        })
    }

    /// Build from config; fails when no webhook URL is configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let Some(url) = config::resolve_webhook_url(config) else {
            anyhow::bail!(
                "no webhook URL configured (set botpress.webhookUrl or BOTPRESS_WEBHOOK_URL)"
            );
        };
        let client = Self::new(
            url,
            config.botpress.payload_shape,
            config.botpress.request_timeout(),
        )?;
        Ok(client)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl WebhookSender for WebhookClient {
    async fn send(&self, payload: &MessagePayload) -> Result<WebhookReply, RelayError> {
        let body = payload.to_json(self.shape);
        log::debug!("webhook request to {}: {}", self.url, body);
        let res = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            log::warn!("webhook returned {}", status);
            return Err(RelayError::HttpStatus(status.as_u16()));
        }
        let bytes = res
            .bytes()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        log::debug!("webhook response: {}", String::from_utf8_lossy(&bytes));
        parse_reply(&bytes)
    }
}
