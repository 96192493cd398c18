use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL, LlmSettings, Provider};
use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE", global = true)]
    pub config: Option<String>,

    /// Port the relay listens on
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,

    /// Address the relay binds to
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the chat relay HTTP server (default)
    Serve,
    /// Start an interactive chat session against a running relay
    Chat {
        /// Base URL of the relay server
        #[arg(long, env = "RELAY_URL")]
        relay_url: Option<String>,

        /// Directory holding saved chats
        #[arg(long, env = "CHAT_STORAGE_DIR")]
        storage_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub relay_url: String,
    pub storage_dir: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Layer defaults, config file, `RELAY_` environment and CLI flags.
    ///
    /// Priority: CLI flag > CLI env var > `RELAY_` env > config file > defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("upstream.timeout_secs", 30)?
            .set_default("upstream.max_tokens", 1024)?
            .set_default("upstream.temperature", 0.7)?
            .set_default("client.relay_url", "http://127.0.0.1:3000")?
            .set_default("client.storage_dir", ".chat-storage")?;

        // An explicit file must exist; ./config.{yaml,toml,json} is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // E.g. RELAY_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("RELAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(host) = &cli.host {
            builder = builder.set_override("server.host", host.as_str())?;
        }
        if let Some(Command::Chat {
            relay_url,
            storage_dir,
        }) = &cli.command
        {
            if let Some(url) = relay_url {
                builder = builder.set_override("client.relay_url", url.as_str())?;
            }
            if let Some(dir) = storage_dir {
                builder =
                    builder.set_override("client.storage_dir", dir.to_string_lossy().into_owned())?;
            }
        }

        builder.build()?.try_deserialize()
    }
}

/// Read upstream credentials and model from the environment.
///
/// A missing API key is not an error here; it is reported at startup and
/// surfaced on each chat request instead.
pub fn load_llm_settings(upstream: &UpstreamConfig) -> Result<LlmSettings, String> {
    let base_url = std::env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    if base_url.trim().is_empty() {
        return Err("LLM_BASE_URL cannot be empty".to_string());
    }

    let model = first_env(&["OPENROUTER_MODEL", "LLM_MODEL"])
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let api_key = first_env(&["OPENROUTER_API_KEY", "LLM_API_KEY"]);

    // Auto-detect provider from base URL
    let provider = Provider::detect_from_url(&base_url);

    Ok(LlmSettings {
        base_url,
        api_key,
        model,
        provider,
        max_tokens: upstream.max_tokens,
        temperature: upstream.temperature,
        timeout: Duration::from_secs(upstream.timeout_secs),
    })
}

/// First non-blank value among the named environment variables.
fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}
