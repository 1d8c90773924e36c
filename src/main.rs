// src/main.rs

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use persona_relay::chat::ChatService;
use persona_relay::config::AppConfig;
use persona_relay::llm::Backend;
use persona_relay::persona::{FsPersonaProvider, PersonaProvider};
use persona_relay::web::{self, AppState};

#[derive(Parser)]
#[command(name = "persona-relay")]
#[command(about = "Character chat relay with word-by-word SSE streaming")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Bind host (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides PORT)
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },

    /// Stream one reply to stdout and exit
    Chat {
        /// Persona role
        #[arg(long, short = 'r', default_value = "default")]
        role: String,

        /// Message to send
        text: String,
    },
}

fn init_logging(level: &str) {
    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).init();
}

fn build_chat(config: &AppConfig) -> Result<ChatService> {
    let personas: Arc<dyn PersonaProvider> = Arc::new(FsPersonaProvider::new(&config.persona_dir));
    let backend = Backend::from_config(config, personas).context("failed to build chat backend")?;
    Ok(ChatService::new(backend))
}

async fn serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let chat = build_chat(&config)?;
    info!(
        backend = chat.backend_name(),
        persona_dir = %config.persona_dir.display(),
        media = config.media.api_key.is_some(),
        "Starting persona relay"
    );

    let state = AppState::new(chat, &config);
    web::run(state, &config.bind_address(), &config.cors_origin).await
}

async fn chat_once(config: AppConfig, role: String, text: String) -> Result<()> {
    let chat = build_chat(&config)?;
    let mut words = chat.stream_chat(&role, None, &text);
    let mut stdout = std::io::stdout();

    while let Some(word) = words.next().await {
        let word = word.context("chat stream failed")?;
        writeln!(stdout, "{}", word)?;
        stdout.flush()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("invalid configuration")?;
    init_logging(&config.log_level);

    match cli.command {
        None => serve(config, None, None).await,
        Some(Command::Serve { host, port }) => serve(config, host, port).await,
        Some(Command::Chat { role, text }) => chat_once(config, role, text).await,
    }
}
