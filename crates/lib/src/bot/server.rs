//! HTTP surface: health probe and the Telegram push endpoint.

use crate::channels::{InboundMessage, TelegramUpdate};
use crate::config::Config;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// How Telegram delivers updates to this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// getUpdates long-poll loop.
    Polling,
    /// Telegram POSTs updates to `/telegram/webhook`.
    Webhook,
}

impl DeliveryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMode::Polling => "polling",
            DeliveryMode::Webhook => "webhook",
        }
    }
}

/// State shared by HTTP handlers.
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub mode: DeliveryMode,
    /// Sender for pushed updates; the bot loop receives.
    pub inbound_tx: mpsc::Sender<InboundMessage>,
}

/// Health is always served; the push endpoint only exists in webhook mode.
pub fn router(state: ServerState) -> Router {
    let mut app = Router::new().route("/", get(health_http));
    if state.mode == DeliveryMode::Webhook {
        app = app.route("/telegram/webhook", post(telegram_webhook));
    }
    app.with_state(state)
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<ServerState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "mode": state.mode.as_str(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /telegram/webhook receives Telegram update JSON; verifies optional secret, pushes InboundMessage.
async fn telegram_webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref expected) = state.config.channels.telegram.webhook_secret {
        let provided = headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            log::warn!("telegram push rejected: secret token mismatch");
            return StatusCode::FORBIDDEN;
        }
    }
    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            log::debug!("telegram push: malformed update: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    let Some(inbound) = InboundMessage::from_update(&update) else {
        return StatusCode::OK;
    };
    if state.inbound_tx.send(inbound).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}
