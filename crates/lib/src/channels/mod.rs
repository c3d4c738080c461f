//! Communication channels (Telegram).
//!
//! Channel connectors receive user messages and hand them to the bot loop as
//! [`InboundMessage`]s; replies go back through [`ChannelHandle`].

mod handle;
mod inbound;
mod telegram;

pub use handle::ChannelHandle;
pub use inbound::InboundMessage;
pub use telegram::{TelegramChannel, TelegramUpdate};
