//! Relay dispatcher: POST one inbound message to the webhook and turn whatever comes back
//! into exactly one reply string.

use crate::channels::InboundMessage;
use crate::relay::extract::extract_reply;
use serde::Serialize;
use std::time::Duration;

/// Upper bound on one webhook exchange (request plus full response body).
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(90);

/// Sent when the webhook answered but no recognized field held a usable value.
pub const EMPTY_REPLY_TEXT: &str = "⚠️ AI responded, but no readable message was found.";
/// Sent when the webhook did not answer within the timeout.
pub const TIMEOUT_TEXT: &str = "⏳ AI response timed out.";
/// Sent for every other failure (connection, status, malformed body).
pub const ERROR_TEXT: &str = "❌ Error communicating with AI.";

/// JSON body of the outbound call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RelayRequest<'a> {
    pub chat_id: i64,
    pub username: Option<&'a str>,
    pub message: &'a str,
}

impl<'a> From<&'a InboundMessage> for RelayRequest<'a> {
    fn from(msg: &'a InboundMessage) -> Self {
        Self {
            chat_id: msg.chat_id,
            username: msg.username.as_deref(),
            message: &msg.text,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("webhook did not respond within {0:?}")]
    Timeout(Duration),
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook returned {0}")]
    Status(reqwest::StatusCode),
    #[error("webhook response is not JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl RelayError {
    /// User-facing text for this failure. Never includes the cause.
    pub fn fallback_text(&self) -> &'static str {
        if self.is_timeout() {
            TIMEOUT_TEXT
        } else {
            ERROR_TEXT
        }
    }

    fn is_timeout(&self) -> bool {
        match self {
            RelayError::Timeout(_) => true,
            RelayError::Request(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Client for the relay webhook.
#[derive(Clone)]
pub struct RelayDispatcher {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl RelayDispatcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_RELAY_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Relay one message and return the text to send back. Always non-empty; never fails.
    pub async fn dispatch(&self, message: &InboundMessage) -> String {
        match self.relay(message).await {
            Ok(Some(reply)) => reply,
            Ok(None) => {
                log::info!("webhook reply had no readable message for chat {}", message.chat_id);
                EMPTY_REPLY_TEXT.to_string()
            }
            Err(e) => {
                if e.is_timeout() {
                    log::warn!("relay for chat {} timed out: {}", message.chat_id, e);
                } else {
                    log::error!("error contacting webhook for chat {}: {:?}", message.chat_id, e);
                }
                e.fallback_text().to_string()
            }
        }
    }

    /// One bounded exchange with the webhook. Ok(None) means the response held no reply.
    pub async fn relay(&self, message: &InboundMessage) -> Result<Option<String>, RelayError> {
        let exchange = self.exchange(RelayRequest::from(message));
        let body = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => return Err(RelayError::Timeout(self.timeout)),
        };
        let value: serde_json::Value = serde_json::from_str(&body)?;
        Ok(extract_reply(&value))
    }

    async fn exchange(&self, request: RelayRequest<'_>) -> Result<String, RelayError> {
        let res = self.client.post(&self.url).json(&request).send().await?;
        let status = res.status();
        let body = res.text().await?;
        log::info!("webhook status: {}", status.as_u16());
        log::info!("webhook raw response: {}", body);
        if !status.is_success() {
            return Err(RelayError::Status(status));
        }
        Ok(body)
    }
}
