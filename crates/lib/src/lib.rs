//! relaybot core library: Telegram channel, command routing, the webhook relay
//! dispatcher, and the bot runtime used by the CLI.

pub mod bot;
pub mod channels;
pub mod commands;
pub mod config;
pub mod init;
pub mod relay;
