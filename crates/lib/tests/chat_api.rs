//! Integration test: chat API client against a fake Botpress server on a local port.
//! The fake records the headers and body of every request so auth headers can be checked.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use bridge::botpress::{ChatApiClient, ChatApiError, NewUser};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct Seen {
    route: &'static str,
    headers: HeaderMap,
    body: Bytes,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn record(log: &Log, route: &'static str, headers: HeaderMap, body: Bytes) {
    log.lock().unwrap().push(Seen {
        route,
        headers,
        body,
    });
}

async fn start_fake_botpress(log: Log) -> String {
    let app = Router::new()
        .route(
            "/v1/chat/conversations",
            post(|State(log): State<Log>, headers: HeaderMap, body: Bytes| async move {
                record(&log, "api-conversation", headers, body);
                Json(json!({ "conversation": { "id": "conv-api" } }))
            }),
        )
        .route(
            "/hook-1/conversations",
            post(|State(log): State<Log>, headers: HeaderMap, body: Bytes| async move {
                record(&log, "chat-conversation", headers, body);
                Json(json!({ "conversation": { "id": "conv-chat" } }))
            }),
        )
        .route(
            "/hook-1/users",
            post(|State(log): State<Log>, headers: HeaderMap, body: Bytes| async move {
                record(&log, "user", headers, body);
                Json(json!({ "user": { "id": "prmods" }, "key": "user-key" }))
            }),
        )
        .route(
            "/denied/v1/chat/conversations",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad token") }),
        )
        .route(
            "/garbage/v1/chat/conversations",
            post(|| async { "not json" }),
        )
        .with_state(log);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake botpress");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

fn header<'a>(seen: &'a Seen, name: &str) -> Option<&'a str> {
    seen.headers.get(name).and_then(|v| v.to_str().ok())
}

fn full_client(base: &str) -> ChatApiClient {
    ChatApiClient::new(
        base,
        base,
        Some("pat-123".to_string()),
        Some("bot-42".to_string()),
        Some("mypass".to_string()),
    )
}

#[tokio::test]
async fn create_conversation_sends_bearer_token_and_bot_id() {
    let log = Log::default();
    let base = start_fake_botpress(log.clone()).await;

    let created = full_client(&base).create_conversation().await.expect("create");
    assert_eq!(created["conversation"]["id"], "conv-api");

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].route, "api-conversation");
    assert_eq!(header(&seen[0], "authorization"), Some("Bearer pat-123"));
    assert_eq!(header(&seen[0], "x-bot-id"), Some("bot-42"));
    assert_eq!(header(&seen[0], "x-bp-secret"), None);
}

#[tokio::test]
async fn create_chat_conversation_sends_secret() {
    let log = Log::default();
    let base = start_fake_botpress(log.clone()).await;

    let created = full_client(&base)
        .create_chat_conversation("hook-1")
        .await
        .expect("create");
    assert_eq!(created["conversation"]["id"], "conv-chat");

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen[0].route, "chat-conversation");
    assert_eq!(header(&seen[0], "x-bp-secret"), Some("mypass"));
    assert_eq!(header(&seen[0], "authorization"), None);
}

#[tokio::test]
async fn create_user_posts_profile_without_secret() {
    let log = Log::default();
    let base = start_fake_botpress(log.clone()).await;
    let user = NewUser {
        name: "Pranav".to_string(),
        id: Some("prmods".to_string()),
        ..Default::default()
    };

    let created = full_client(&base)
        .create_user("hook-1", &user)
        .await
        .expect("create user");
    assert_eq!(created["user"]["id"], "prmods");

    let seen = log.lock().unwrap().clone();
    assert_eq!(seen[0].route, "user");
    assert_eq!(header(&seen[0], "x-bp-secret"), None);
    let body: Value = serde_json::from_slice(&seen[0].body).expect("user body");
    assert_eq!(body, json!({ "name": "Pranav", "id": "prmods" }));
}

#[tokio::test]
async fn missing_credentials_fail_before_any_request() {
    let log = Log::default();
    let base = start_fake_botpress(log.clone()).await;

    let no_token = ChatApiClient::new(&base, &base, None, Some("bot-42".to_string()), None);
    let err = no_token.create_conversation().await.unwrap_err();
    assert!(matches!(err, ChatApiError::Missing("botpress token")));

    let no_bot = ChatApiClient::new(&base, &base, Some("pat".to_string()), None, None);
    let err = no_bot.create_conversation().await.unwrap_err();
    assert!(matches!(err, ChatApiError::Missing("botpress bot id")));

    let err = no_bot.create_chat_conversation("hook-1").await.unwrap_err();
    assert!(matches!(err, ChatApiError::Missing(_)));

    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn error_status_keeps_status_and_body() {
    let base = start_fake_botpress(Log::default()).await;
    let client = full_client(&format!("{}/denied", base));
    match client.create_conversation().await.unwrap_err() {
        ChatApiError::Api(status, body) => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad token");
        }
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn non_json_success_body_is_a_decode_error() {
    let base = start_fake_botpress(Log::default()).await;
    let client = full_client(&format!("{}/garbage", base));
    let err = client.create_conversation().await.unwrap_err();
    assert!(matches!(err, ChatApiError::Decode(_)));
    assert!(err.to_string().starts_with("botpress returned invalid JSON"));
}
