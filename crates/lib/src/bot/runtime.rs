//! Bot runtime: wire the Telegram channel to the relay dispatcher and serve HTTP until shutdown.

use crate::bot::server::{self, DeliveryMode, ServerState};
use crate::channels::{ChannelHandle, InboundMessage, TelegramChannel};
use crate::commands::{self, Command};
use crate::config::{self, Config};
use crate::relay::{RelayDispatcher, ERROR_TEXT};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const INBOUND_QUEUE: usize = 64;

/// Routes inbound messages to the greeting or the relay and delivers the reply.
#[derive(Clone)]
pub struct Responder {
    dispatcher: RelayDispatcher,
    /// Own username from getMe; commands addressed to other bots are ignored when known.
    bot_username: Option<String>,
}

impl Responder {
    pub fn new(dispatcher: RelayDispatcher) -> Self {
        Self {
            dispatcher,
            bot_username: None,
        }
    }

    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    pub fn dispatcher(&self) -> &RelayDispatcher {
        &self.dispatcher
    }

    /// Decide the reply for one inbound message. None for commands the bot does not answer.
    pub async fn reply_for(&self, msg: &InboundMessage) -> Option<String> {
        self.route(msg).await.map(|(reply, _)| reply)
    }

    /// Reply text plus whether it came from the relay.
    async fn route(&self, msg: &InboundMessage) -> Option<(String, bool)> {
        match Command::parse(&msg.text, self.bot_username.as_deref()) {
            Command::Start => Some((commands::greeting().to_string(), false)),
            Command::Unknown(name) => {
                log::debug!("ignoring command /{} from chat {}", name, msg.chat_id);
                None
            }
            Command::Relay => Some((self.dispatcher.dispatch(msg).await, true)),
        }
    }

    /// Process one inbound message: route it, then send the reply back to the chat.
    /// If the chat rejects a relay reply (e.g. too long), the generic error text is sent once instead.
    pub async fn handle_inbound(&self, channel: &dyn ChannelHandle, msg: InboundMessage) {
        let Some((reply, relayed)) = self.route(&msg).await else {
            return;
        };
        let Err(e) = channel.send_message(msg.chat_id, &reply).await else {
            return;
        };
        log::warn!(
            "{}: send_message to chat {} failed: {}",
            channel.id(),
            msg.chat_id,
            e
        );
        if !relayed || reply == ERROR_TEXT {
            return;
        }
        if let Err(e) = channel.send_message(msg.chat_id, ERROR_TEXT).await {
            log::warn!(
                "{}: error reply to chat {} failed: {}",
                channel.id(),
                msg.chat_id,
                e
            );
        }
    }
}

/// Receive inbound messages until every sender is gone; each message is handled in its own task.
pub fn spawn_inbound_processor(
    responder: Arc<Responder>,
    channel: Arc<dyn ChannelHandle>,
    mut inbound_rx: mpsc::Receiver<InboundMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = inbound_rx.recv().await {
            let responder = responder.clone();
            let channel = channel.clone();
            tokio::spawn(async move {
                responder.handle_inbound(channel.as_ref(), msg).await;
            });
        }
        log::debug!("inbound processor stopped");
    })
}

/// Run the bot; binds the HTTP server to config.server.bind:config.server.port.
/// Startup fails when the Telegram bot token or the relay webhook URL is missing, when getMe
/// rejects the token, or when registering the push URL fails in webhook mode.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_bot(config: Config) -> Result<()> {
    let token = config::resolve_telegram_token(&config).context(
        "telegram bot token not configured (set TELEGRAM_BOT_TOKEN or channels.telegram.botToken)",
    )?;
    let relay_url = config::resolve_relay_url(&config)
        .context("relay webhook URL not configured (set N8N_WEBHOOK_URL or relay.webhookUrl)")?;
    let api_base = config::resolve_telegram_api_base(&config);

    let telegram = Arc::new(TelegramChannel::new(token, api_base));
    let bot_username = telegram
        .get_me()
        .await
        .map_err(|e| anyhow!("telegram getMe: {}", e))?;
    let mut responder = Responder::new(RelayDispatcher::new(relay_url));
    match bot_username {
        Some(name) => {
            log::info!("telegram bot @{}", name);
            responder = responder.with_bot_username(name);
        }
        None => log::warn!("telegram getMe returned no username; accepting /start@any"),
    }
    log::info!("relaying messages to {}", responder.dispatcher().url());

    let mut channel_tasks = Vec::new();
    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(INBOUND_QUEUE);
    let mode = match config.channels.telegram.webhook_url.as_deref() {
        Some(url) => {
            let secret = config.channels.telegram.webhook_secret.as_deref();
            telegram
                .set_webhook(url, secret)
                .await
                .map_err(|e| anyhow!("telegram setWebhook for {}: {}", url, e))?;
            log::info!("telegram channel registered (webhook mode): {}", url);
            DeliveryMode::Webhook
        }
        None => {
            // Clear any push URL left from an earlier run; getUpdates is refused while one is set.
            if let Err(e) = telegram.delete_webhook().await {
                log::debug!("telegram delete_webhook before polling: {}", e);
            }
            channel_tasks.push(telegram.clone().start_inbound(inbound_tx.clone()));
            log::info!("telegram channel registered and getUpdates loop started");
            DeliveryMode::Polling
        }
    };
    let processor = spawn_inbound_processor(Arc::new(responder), telegram.clone(), inbound_rx);

    let bind = config.server.bind.trim().to_string();
    let bind_addr = format!("{}:{}", bind, config.server.port);
    let app = server::router(ServerState {
        config: Arc::new(config),
        mode,
        inbound_tx,
    });
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("bot is running; http listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(telegram, mode, channel_tasks))
        .await
        .context("http server exited")?;
    processor.abort();
    log::info!("bot stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Stops the channel connector, removes the Telegram push URL if used, then awaits the poll task.
async fn shutdown_signal(
    telegram: Arc<TelegramChannel>,
    mode: DeliveryMode,
    channel_tasks: Vec<JoinHandle<()>>,
) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, stopping channel");

    telegram.stop();
    if mode == DeliveryMode::Webhook {
        if let Err(e) = telegram.delete_webhook().await {
            log::debug!("telegram delete_webhook on shutdown: {}", e);
        }
    }
    for h in channel_tasks {
        // A poll in flight can take up to the long-poll timeout to return.
        h.abort();
        let _ = h.await;
    }
    log::info!("channel tasks finished");
}
