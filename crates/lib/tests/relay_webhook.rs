//! Integration tests: run the dispatcher against a local axum server standing in for the webhook.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use relay::channels::InboundMessage;
use relay::relay::{RelayDispatcher, EMPTY_REPLY_TEXT, ERROR_TEXT, TIMEOUT_TEXT};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}/hook", addr)
}

/// Webhook that always answers 200 with the given raw body.
async fn raw_webhook(body: &'static str) -> String {
    let app = Router::new().route(
        "/hook",
        post(move || async move { (StatusCode::OK, body) }),
    );
    spawn_server(app).await
}

fn message(text: &str) -> InboundMessage {
    InboundMessage {
        chat_id: 1001,
        username: Some("ann".to_string()),
        text: text.to_string(),
    }
}

async fn reply_for_body(body: &'static str) -> String {
    let url = raw_webhook(body).await;
    RelayDispatcher::new(url).dispatch(&message("hello")).await
}

#[tokio::test]
async fn array_response_uses_first_output() {
    assert_eq!(reply_for_body(r#"[{"output": "hi"}]"#).await, "hi");
}

#[tokio::test]
async fn object_reply_takes_precedence() {
    assert_eq!(reply_for_body(r#"{"reply": "a", "output": "b"}"#).await, "a");
}

#[tokio::test]
async fn nested_body_output() {
    assert_eq!(reply_for_body(r#"{"body": {"output": "x"}}"#).await, "x");
}

#[tokio::test]
async fn unrecognized_shapes_yield_empty_reply_sentinel() {
    for body in ["{}", "[]", "42", r#"{"output": ""}"#, r#"[{"reply": "r"}]"#] {
        assert_eq!(reply_for_body(body).await, EMPTY_REPLY_TEXT, "body: {}", body);
    }
}

#[tokio::test]
async fn malformed_json_yields_error_sentinel() {
    assert_eq!(reply_for_body("<html>oops</html>").await, ERROR_TEXT);
    assert_eq!(reply_for_body("").await, ERROR_TEXT);
}

#[tokio::test]
async fn non_success_status_yields_error_sentinel() {
    let app = Router::new().route(
        "/hook",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"reply": "should not be used"})),
            )
        }),
    );
    let url = spawn_server(app).await;
    let reply = RelayDispatcher::new(url).dispatch(&message("hello")).await;
    assert_eq!(reply, ERROR_TEXT);
}

#[tokio::test]
async fn slow_webhook_yields_timeout_sentinel() {
    let app = Router::new().route(
        "/hook",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"reply": "too late"}))
        }),
    );
    let url = spawn_server(app).await;
    let dispatcher = RelayDispatcher::with_timeout(url, Duration::from_millis(200));
    let started = std::time::Instant::now();
    let reply = dispatcher.dispatch(&message("hello")).await;
    assert_eq!(reply, TIMEOUT_TEXT);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn connection_refused_yields_error_sentinel() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local_addr").port();
    drop(listener);
    let dispatcher = RelayDispatcher::new(format!("http://127.0.0.1:{}/hook", port));
    assert_eq!(dispatcher.dispatch(&message("hello")).await, ERROR_TEXT);
}

#[tokio::test]
async fn request_body_carries_chat_username_and_text() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/hook",
            post(
                |State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                    seen.lock().await.push(body);
                    Json(json!([{"output": "ok"}]))
                },
            ),
        )
        .with_state(seen.clone());
    let url = spawn_server(app).await;
    let dispatcher = RelayDispatcher::new(url);

    let reply = dispatcher.dispatch(&message("  What's up?  ")).await;
    assert_eq!(reply, "ok");
    let anonymous = InboundMessage {
        chat_id: -42,
        username: None,
        text: "hi".to_string(),
    };
    assert_eq!(dispatcher.dispatch(&anonymous).await, "ok");

    let seen = seen.lock().await;
    assert_eq!(
        seen.as_slice(),
        &[
            json!({"chat_id": 1001, "username": "ann", "message": "  What's up?  "}),
            json!({"chat_id": -42, "username": null, "message": "hi"}),
        ]
    );
}
