//! Gateway HTTP server: inbound message API, chat proxy, and health.

use crate::botpress::{MessagePayload, WebhookSender};
use crate::config::Config;
use crate::conversation::ConversationCell;
use crate::gateway::protocol::{ChatProxyResponse, InboundRequest, ReceivedAck};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    /// Current conversation id; written by `/api/message` and `/api/chat`, read by the relay.
    pub conversation: ConversationCell,
    /// Webhook used by `/api/chat`. None disables that route (503).
    pub webhook: Option<Arc<dyn WebhookSender>>,
}

impl GatewayState {
    pub fn new(
        config: Config,
        conversation: ConversationCell,
        webhook: Option<Arc<dyn WebhookSender>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            conversation,
            webhook,
        }
    }
}

/// CORS for `/api/*`: configured origins, POST and preflight, JSON content type.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

/// Build the router without binding. Used by `run_gateway` and by tests.
pub fn build_router(state: GatewayState) -> Router {
    let api = Router::new()
        .route("/message", post(receive_message))
        .route("/chat", post(chat_proxy))
        .layer(cors_layer(&state.config.gateway.cors_origins));
    Router::new()
        .route("/", get(health_http))
        .nest("/api", api)
        .with_state(state)
}

/// Run the gateway; binds to config.gateway.bind:config.gateway.port.
/// Blocks until SIGINT/SIGTERM, or until `stop` fires (e.g. the relay received quit).
pub async fn run_gateway(state: GatewayState, stop: Option<oneshot::Receiver<()>>) -> Result<()> {
    let bind_addr = format!(
        "{}:{}",
        state.config.gateway.bind.trim(),
        state.config.gateway.port
    );
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);
    log::info!("inbound endpoint: http://{}/api/message", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(stop))
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT, SIGTERM, or `stop`).
/// A dropped `stop` sender is not a shutdown request.
async fn shutdown_signal(stop: Option<oneshot::Receiver<()>>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let requested = async {
        if let Some(rx) = stop {
            if rx.await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await
    };

    tokio::select! {
        _ = ctrl_c => log::info!("shutdown signal received"),
        _ = terminate => log::info!("shutdown signal received"),
        _ = requested => log::info!("shutdown requested"),
    }
}

fn bad_request(e: serde_json::Error) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": format!("invalid JSON body: {}", e) })),
    )
        .into_response()
}

/// POST /api/message — record the conversation id as current and acknowledge.
async fn receive_message(State(state): State<GatewayState>, body: Bytes) -> Response {
    let req: InboundRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return bad_request(e),
    };
    let conversation_id = req
        .conversation_id
        .unwrap_or_else(|| state.config.botpress.default_conversation_id.clone());
    log::info!(
        "received from client: {:?} (conversationId {})",
        req.message.as_deref().unwrap_or(""),
        conversation_id
    );
    if let Some(old) = state.conversation.set(conversation_id.as_str()).await {
        if old != conversation_id {
            log::debug!("conversation id changed: {} -> {}", old, conversation_id);
        }
    }
    (StatusCode::OK, Json(ReceivedAck::received())).into_response()
}

/// POST /api/chat — forward the message to the webhook and answer with the bot reply.
/// Send failures are returned as the `response` text with status 200.
async fn chat_proxy(State(state): State<GatewayState>, body: Bytes) -> Response {
    let req: InboundRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return bad_request(e),
    };
    let Some(webhook) = state.webhook.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "no webhook configured" })),
        )
            .into_response();
    };
    let message = req.message.unwrap_or_default();
    let user_id = req
        .user_id
        .unwrap_or_else(|| state.config.botpress.user_id.clone());
    let conversation_id = req
        .conversation_id
        .unwrap_or_else(|| state.config.botpress.default_conversation_id.clone());
    log::info!("chat proxy: {:?} (conversationId {})", message, conversation_id);

    let payload = MessagePayload::new(conversation_id.as_str(), user_id.as_str(), message);
    let (response, conversation_id) = match webhook.send(&payload).await {
        Ok(reply) => (
            reply.text,
            reply.conversation_id.unwrap_or(conversation_id),
        ),
        Err(e) => {
            log::warn!("chat proxy: {}", e);
            (e.to_string(), conversation_id)
        }
    };
    state.conversation.set(conversation_id.as_str()).await;
    log::info!("bot response: {:?} (conversationId {})", response, conversation_id);
    Json(ChatProxyResponse {
        response,
        conversation_id,
        user_id,
    })
    .into_response()
}

/// GET / returns a simple health JSON.
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "conversationId": state.conversation.get().await,
    }))
}
