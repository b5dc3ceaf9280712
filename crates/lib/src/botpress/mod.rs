//! Botpress Cloud clients.
//!
//! The webhook client carries relay traffic (one POST per message, reply parsed from the body).
//! The chat API client covers conversation and user creation.

mod chat_api;
mod payload;
mod webhook;

pub use chat_api::{ChatApiClient, ChatApiError, NewUser};
pub use payload::{parse_reply, MessagePayload, WebhookReply, FALLBACK_REPLY};
pub use webhook::{RelayError, WebhookClient, WebhookSender};
