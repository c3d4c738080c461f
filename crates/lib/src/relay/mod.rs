//! Outbound relay to the automation webhook.
//!
//! The dispatcher posts `{chat_id, username, message}` with a fixed wait bound and maps the
//! response (or the failure) to a single reply string.

mod dispatcher;
mod extract;

pub use dispatcher::{
    RelayDispatcher, RelayError, RelayRequest, DEFAULT_RELAY_TIMEOUT, EMPTY_REPLY_TEXT,
    ERROR_TEXT, TIMEOUT_TEXT,
};
pub use extract::extract_reply;
