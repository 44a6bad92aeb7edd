//! Application wiring against a mock REST backend and push server.

mod common;
use common::PushServer;

use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stockassist_app::{AppConfig, AppError, Application};
use stockassist_chat::{ChatMessage, RecordingView, SubmitRequest, ViewEvent};
use stockassist_core::ChatId;
use stockassist_suggest::SuggestionUpdate;
use tokio::time::timeout;

fn config_for(base_url: &str, push_url: &str) -> AppConfig {
    AppConfig::from_toml(&format!(
        r#"
        base_url = "{base_url}"
        session_cookie = "session=abc"

        [websocket]
        url = "{push_url}"

        [suggest]
        debounce_ms = 10
        "#
    ))
    .unwrap()
}

#[tokio::test]
async fn test_push_event_settles_submitted_message() {
    let http = MockServer::start_async().await;
    let queue = http
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/chat/queue")
                .header("cookie", "session=abc");
            then.status(200)
                .json_body(json!({"operation_id": "op-1", "chat_id": 7, "messages_left": 9}));
        })
        .await;
    http.mock_async(|when, then| {
        when.method(GET).path("/api/chat/status/op-1");
        then.status(200).json_body(json!({
            "status": "processing",
            "current_step": "Analyzing",
            "steps": [{"description": "Fetching data"}, {"description": "Analyzing"}]
        }));
    })
    .await;
    http.mock_async(|when, then| {
        when.method(GET).path("/api/metrics/usage");
        then.status(200).json_body(json!({
            "messages": {"used": 2, "limit": 10},
            "images": {"used": 0, "limit": 1},
            "next_reset": "2030-01-01T00:00:00"
        }));
    })
    .await;

    let push = PushServer::start().await;
    let view = Arc::new(RecordingView::new());
    let mut app = Application::new(config_for(&http.base_url(), &push.url()), view.clone()).unwrap();
    app.start().unwrap();
    push.wait_for_join().await;
    assert_eq!(push.cookie().as_deref(), Some("session=abc"));

    let handle = app
        .coordinator()
        .submit(SubmitRequest::new("How is AAPL?").with_symbols("AAPL"))
        .await
        .unwrap();
    assert_eq!(handle.chat_id, Some(ChatId::from(7u64)));
    queue.assert_async().await;

    push.emit(
        r#"42["chat_completed",{"operation_id":"op-1","response":"AAPL looks strong","messages_left":8}]"#,
    )
    .await;

    let outcome = timeout(Duration::from_secs(5), handle.wait())
        .await
        .expect("settled within timeout")
        .expect("outcome delivered");
    assert_eq!(outcome.text(), "AAPL looks strong");

    app.shutdown().await;

    assert_eq!(
        view.messages(),
        vec![
            ChatMessage::user("How is AAPL?", Vec::new()),
            ChatMessage::assistant("AAPL looks strong"),
        ]
    );
    assert_eq!(view.count(|e| *e == ViewEvent::ChatChanged(ChatId::from(7u64))), 1);
}

#[tokio::test]
async fn test_suggestions_flow_through_application() {
    let http = MockServer::start_async().await;
    http.mock_async(|when, then| {
        when.method(GET).path("/api/stock/suggest/appl");
        then.status(200).json_body(json!([
            {"symbol": "APPLE", "exchange": "OTC", "name": "Apple Hospitality"},
            {"symbol": "AAPL", "exchange": "NASDAQ", "name": "Apple Inc."}
        ]));
    })
    .await;

    let push = PushServer::start().await;
    let app = Application::new(
        config_for(&http.base_url(), &push.url()),
        Arc::new(RecordingView::new()),
    )
    .unwrap();

    let mut rx = app.suggestions().subscribe();
    app.suggestions().on_input("appl");
    timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("update within timeout")
        .unwrap();

    let update = rx.borrow().clone();
    let SuggestionUpdate::Ready { suggestions, .. } = update else {
        panic!("Expected Ready, got {update:?}");
    };
    assert_eq!(suggestions[0].candidate.symbol, "AAPL");
    assert_eq!(suggestions[0].candidate.exchange, "NASDAQ");

    app.shutdown().await;
}

#[tokio::test]
async fn test_invalid_cookie_is_a_config_error() {
    let mut config = AppConfig::default();
    config.session_cookie = Some("bad\ncookie".to_string());

    let result = Application::new(config, Arc::new(RecordingView::new()));
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let push = PushServer::start().await;
    let mut app = Application::new(
        config_for("http://127.0.0.1:9", &push.url()),
        Arc::new(RecordingView::new()),
    )
    .unwrap();

    app.start().unwrap();
    assert!(matches!(app.start(), Err(AppError::Config(_))));
    app.shutdown().await;
}
