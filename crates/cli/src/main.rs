use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "relaybot")]
#[command(about = "Relay Telegram messages to a webhook and send its reply back", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: RELAYBOT_CONFIG_PATH or ~/.relaybot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the bot: receive Telegram messages, relay them to the webhook, reply with the result.
    Run {
        /// Config file path (default: RELAYBOT_CONFIG_PATH or ~/.relaybot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port for health and Telegram push delivery (default from config or 15151)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send one message through the relay webhook and print the reply the chat would get.
    Ask {
        /// Message text.
        message: String,

        /// Chat id to put in the request body.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        chat_id: i64,

        /// Username to put in the request body.
        #[arg(long)]
        username: Option<String>,

        /// Config file path (default: RELAYBOT_CONFIG_PATH or ~/.relaybot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("relaybot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run { config, port }) => {
            if let Err(e) = run_bot(config, port).await {
                log::error!("bot failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask {
            message,
            chat_id,
            username,
            config,
        }) => {
            if let Err(e) = run_ask(config, message, chat_id, username).await {
                log::error!("ask failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(relay::config::default_config_path);
    let dir = relay::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_bot(config_path: Option<std::path::PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = relay::config::load_config(config_path)?;
    if let Some(p) = port {
        config.server.port = p;
    }
    log::info!("starting relaybot with config {}", path.display());
    relay::bot::run_bot(config).await
}

async fn run_ask(
    config_path: Option<std::path::PathBuf>,
    message: String,
    chat_id: i64,
    username: Option<String>,
) -> anyhow::Result<()> {
    let (config, _) = relay::config::load_config(config_path)?;
    let url = relay::config::resolve_relay_url(&config).ok_or_else(|| {
        anyhow::anyhow!("relay webhook URL not configured (set N8N_WEBHOOK_URL or relay.webhookUrl)")
    })?;
    let responder = relay::bot::Responder::new(relay::relay::RelayDispatcher::new(url));
    let msg = relay::channels::InboundMessage {
        chat_id,
        username,
        text: message,
    };
    let reply = responder
        .reply_for(&msg)
        .await
        .unwrap_or_default();
    println!("{}", reply);
    Ok(())
}
