//! Integration tests: TelegramChannel against a local axum stand-in for the Bot API.

use axum::{
    extract::{RawQuery, State},
    routing::{get, post},
    Json, Router,
};
use relay::channels::{ChannelHandle, InboundMessage, TelegramChannel};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

const TOKEN: &str = "123-test";

#[derive(Clone, Default)]
struct BotApi {
    polls: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
    sent: Arc<Mutex<Vec<Value>>>,
}

async fn get_updates(State(api): State<BotApi>, RawQuery(query): RawQuery) -> Json<Value> {
    api.queries.lock().await.push(query.unwrap_or_default());
    if api.polls.fetch_add(1, Ordering::SeqCst) == 0 {
        Json(json!({"ok": true, "result": [
            {"update_id": 40, "message": {"chat": {"id": 5}, "from": {"username": "ann"}, "text": "first"}},
            {"update_id": 41, "message": {"chat": {"id": 5}, "photo": []}},
            {"update_id": 42, "message": {"chat": {"id": 6}, "text": "/start"}}
        ]}))
    } else {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Json(json!({"ok": true, "result": []}))
    }
}

async fn send_message(State(api): State<BotApi>, Json(body): Json<Value>) -> Json<Value> {
    api.sent.lock().await.push(body);
    Json(json!({"ok": true, "result": {}}))
}

async fn spawn_bot_api(api: BotApi) -> String {
    let app = Router::new()
        .route(&format!("/bot{}/getUpdates", TOKEN), get(get_updates))
        .route(&format!("/bot{}/sendMessage", TOKEN), post(send_message))
        .route(
            &format!("/bot{}/getMe", TOKEN),
            get(|| async {
                Json(json!({"ok": true, "result": {"id": 7, "is_bot": true, "first_name": "Relay", "username": "relay_bot"}}))
            }),
        )
        .with_state(api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn long_poll_forwards_text_messages_and_advances_offset() {
    let api = BotApi::default();
    let base = spawn_bot_api(api.clone()).await;
    let channel = Arc::new(TelegramChannel::new(TOKEN.to_string(), base));
    let (tx, mut rx) = mpsc::channel(8);
    let handle = channel.clone().start_inbound(tx);

    let first = rx.recv().await.expect("first");
    let second = rx.recv().await.expect("second");
    assert_eq!(
        first,
        InboundMessage {
            chat_id: 5,
            username: Some("ann".to_string()),
            text: "first".to_string(),
        }
    );
    assert_eq!(second.chat_id, 6);
    assert_eq!(second.text, "/start");

    for _ in 0..100 {
        if api.polls.load(Ordering::SeqCst) >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    channel.stop();
    let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;

    let queries = api.queries.lock().await;
    assert!(!queries[0].contains("offset="));
    assert!(queries[1].contains("offset=43"), "queries: {:?}", queries);
}

#[tokio::test]
async fn send_message_posts_chat_and_text() {
    let api = BotApi::default();
    let base = spawn_bot_api(api.clone()).await;
    let channel = TelegramChannel::new(TOKEN.to_string(), format!("{}/", base));
    channel
        .send_message(-100, "⏳ AI response timed out.")
        .await
        .expect("send");
    assert_eq!(
        api.sent.lock().await.as_slice(),
        &[json!({"chat_id": -100, "text": "⏳ AI response timed out."})]
    );
}

#[tokio::test]
async fn send_message_reports_api_errors() {
    let api = BotApi::default();
    let base = spawn_bot_api(api).await;
    let channel = TelegramChannel::new("wrong-token".to_string(), base);
    let err = channel.send_message(1, "x").await.expect_err("404 from api");
    assert!(err.contains("sendMessage failed"), "err: {}", err);
}

#[tokio::test]
async fn get_me_returns_bot_username() {
    let base = spawn_bot_api(BotApi::default()).await;
    let channel = TelegramChannel::new(TOKEN.to_string(), base.clone());
    assert_eq!(
        channel.get_me().await.expect("getMe"),
        Some("relay_bot".to_string())
    );
    let wrong = TelegramChannel::new("wrong-token".to_string(), base);
    assert!(wrong.get_me().await.is_err());
}
