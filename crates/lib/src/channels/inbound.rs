//! Inbound message from a channel: delivered to the bot loop for command routing and relay.

use super::telegram::TelegramUpdate;

/// A text message from a chat, to be answered by the greeting or the relay dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Reply destination (Telegram chat id).
    pub chat_id: i64,
    /// Sender username; channel posts and some privacy settings leave it out.
    pub username: Option<String>,
    pub text: String,
}

impl InboundMessage {
    /// Project a Telegram update to an inbound message. None when the update carries no text message.
    pub fn from_update(update: &TelegramUpdate) -> Option<Self> {
        let msg = update.message.as_ref()?;
        let text = msg.text.as_ref()?;
        Some(Self {
            chat_id: msg.chat.id,
            username: msg.from.as_ref().and_then(|u| u.username.clone()),
            text: text.clone(),
        })
    }
}
