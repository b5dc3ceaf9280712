//! Botpress chat API calls that sit outside the relay: creating conversations and users.

use crate::config::{self, Config};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ChatApiError {
    #[error("botpress request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("botpress api error: {0} {1}")]
    Api(u16, String),
    #[error("botpress returned invalid JSON: {0}")]
    Decode(String),
    #[error("{0} not configured")]
    Missing(&'static str),
}

/// User profile for `POST /{webhookId}/users`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Clone)]
pub struct ChatApiClient {
    api_base: String,
    chat_base: String,
    token: Option<String>,
    bot_id: Option<String>,
    secret: Option<String>,
    client: reqwest::Client,
}

impl ChatApiClient {
    pub fn new(
        api_base: &str,
        chat_base: &str,
        token: Option<String>,
        bot_id: Option<String>,
        secret: Option<String>,
    ) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            chat_base: chat_base.trim_end_matches('/').to_string(),
            token,
            bot_id,
            secret,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.botpress.api_base,
            &config.botpress.chat_base,
            config::resolve_token(config),
            config::resolve_bot_id(config),
            config::resolve_webhook_secret(config),
        )
    }

    /// POST /v1/chat/conversations — authenticated with the PAT and bot id.
    pub async fn create_conversation(&self) -> Result<Value, ChatApiError> {
        let token = self.token.as_ref().ok_or(ChatApiError::Missing("botpress token"))?;
        let bot_id = self.bot_id.as_ref().ok_or(ChatApiError::Missing("botpress bot id"))?;
        let url = format!("{}/v1/chat/conversations", self.api_base);
        log::info!("creating conversation via {}", url);
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("accept", "application/json")
            .header("x-bot-id", bot_id)
            .send()
            .await?;
        read_json(res).await
    }

    /// POST /{webhook_id}/conversations on the chat integration, authenticated with `x-bp-secret`.
    pub async fn create_chat_conversation(&self, webhook_id: &str) -> Result<Value, ChatApiError> {
        let secret = self
            .secret
            .as_ref()
            .ok_or(ChatApiError::Missing("botpress webhook secret"))?;
        let url = format!("{}/{}/conversations", self.chat_base, webhook_id);
        log::info!("creating chat conversation via {}", url);
        let res = self
            .client
            .post(&url)
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .header("x-bp-secret", secret)
            .send()
            .await?;
        read_json(res).await
    }

    /// POST /{webhook_id}/users on the chat integration. Unauthenticated.
    pub async fn create_user(&self, webhook_id: &str, user: &NewUser) -> Result<Value, ChatApiError> {
        let url = format!("{}/{}/users", self.chat_base, webhook_id);
        log::info!("creating user {} via {}", user.name, url);
        let res = self
            .client
            .post(&url)
            .header("accept", "application/json")
            .json(user)
            .send()
            .await?;
        read_json(res).await
    }
}

async fn read_json(res: reqwest::Response) -> Result<Value, ChatApiError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(ChatApiError::Api(status.as_u16(), body));
    }
    let text = res.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| ChatApiError::Decode(e.to_string()))
}
