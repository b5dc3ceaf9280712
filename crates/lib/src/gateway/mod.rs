//! Gateway: inbound HTTP API.
//!
//! `POST /api/message` records the caller's conversation id for the relay; `POST /api/chat`
//! forwards a message to the webhook and returns the reply; `GET /` reports health.

mod protocol;
mod server;

pub use protocol::{ChatProxyResponse, InboundRequest, ReceivedAck};
pub use server::{build_router, run_gateway, GatewayState};
