//! Outbound message bodies and webhook reply parsing.

use crate::botpress::webhook::RelayError;
use crate::config::PayloadShape;
use serde_json::{json, Value};

/// Reply text used when the webhook answers without a `text` field.
pub const FALLBACK_REPLY: &str = "Sorry, I could not process your request.";

/// One outbound text message. Built fresh for every send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePayload {
    pub conversation_id: String,
    pub user_id: String,
    pub text: String,
}

impl MessagePayload {
    pub fn new(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            text: text.into(),
        }
    }

    /// JSON body for the webhook in the given layout.
    pub fn to_json(&self, shape: PayloadShape) -> Value {
        match shape {
            PayloadShape::Nested => json!({
                "conversationId": self.conversation_id,
                "payload": {
                    "message": self.text,
                    "userId": self.user_id,
                    "type": "text",
                    "text": self.text,
                    "metadata": {}
                }
            }),
            PayloadShape::Flat => json!({
                "message": self.text,
                "conversationId": self.conversation_id,
                "userId": self.user_id,
                "payload": {
                    "type": "text",
                    "text": self.text,
                    "metadata": {}
                }
            }),
        }
    }
}

/// What the webhook answered: the reply text and, when present, the conversation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReply {
    pub text: String,
    pub conversation_id: Option<String>,
}

/// Parse a webhook response body. Accepts an object or an array whose first element is the reply.
pub fn parse_reply(body: &[u8]) -> Result<WebhookReply, RelayError> {
    if body.is_empty() {
        return Err(RelayError::EmptyBody);
    }
    let data: Value =
        serde_json::from_slice(body).map_err(|e| RelayError::Decode(e.to_string()))?;
    let reply = match &data {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    let text = reply
        .and_then(|r| r.get("text"))
        .and_then(|v| v.as_str())
        .unwrap_or(FALLBACK_REPLY)
        .to_string();
    let conversation_id = reply
        .and_then(|r| r.get("conversationId"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    Ok(WebhookReply {
        text,
        conversation_id,
    })
}
