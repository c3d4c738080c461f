//! Bot runtime and HTTP surface.
//!
//! Inbound messages arrive from the Telegram long-poll loop or the push endpoint, go
//! through command routing, and get exactly one reply (greeting or relay result).

mod runtime;
mod server;

pub use runtime::{run_bot, spawn_inbound_processor, Responder};
pub use server::{router, DeliveryMode, ServerState};
