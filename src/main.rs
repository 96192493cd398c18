//! OpenRouter Chat Relay
//!
//! Entry point: `relay serve` runs the HTTP relay, `relay chat` the terminal client.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use openrouter_chat_relay::client::HttpRelayClient;
use openrouter_chat_relay::config::{AppConfig, Cli, Command, load_llm_settings};
use openrouter_chat_relay::session::{ConversationManager, FileStorage};
use openrouter_chat_relay::ui::{ChatView, terminal};
use openrouter_chat_relay::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Command::Serve);

    // The chat client owns the terminal, so it only logs warnings by default.
    let default_level = match command {
        Command::Serve => "info",
        Command::Chat { .. } => "warn",
    };
    init_tracing(default_level, cli.log_json);

    let config = Arc::new(AppConfig::from_cli(&cli)?);
    let settings = load_llm_settings(&config.upstream).map_err(anyhow::Error::msg)?;

    match command {
        Command::Serve => server::start_server(config, settings).await,
        Command::Chat { .. } => {
            let storage = FileStorage::open(&config.client.storage_dir)?;
            let relay = Arc::new(HttpRelayClient::new(config.client.relay_url.as_str()));
            tracing::info!(
                relay_url = %config.client.relay_url,
                storage_dir = %storage.dir().display(),
                "Starting chat client"
            );

            let manager = ConversationManager::new(Box::new(storage), relay);
            terminal::run(manager, ChatView::new(settings.model)).await
        }
    }
}

/// Initialize tracing (M-LOG-STRUCTURED). `RUST_LOG` overrides the default level.
fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
