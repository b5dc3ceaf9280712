//! HTTP API request and response bodies.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/message` and `POST /api/chat`. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default, rename = "conversationId")]
    pub conversation_id: Option<String>,
}

/// Acknowledgement for `POST /api/message`: `{ "status": "received" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedAck {
    pub status: String,
}

impl ReceivedAck {
    pub fn received() -> Self {
        Self {
            status: "received".to_string(),
        }
    }
}

/// Response of `POST /api/chat`: the bot reply (or a failure description) and the conversation it landed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatProxyResponse {
    pub response: String,
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    pub user_id: String,
}
