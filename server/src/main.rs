use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use concord_server::config::ServerConfig;
use concord_server::engine::chat_engine::ChatEngine;
use concord_server::history::store::HistoryStore;
use concord_server::net::listener::start_listener;

/// Multi-room line-oriented chat server with persistent room history.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "palaver.toml")]
    config: String,

    /// Listen address, overriding the configuration file.
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ServerConfig::load(&cli.config);
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }

    let store =
        HistoryStore::new(&config.history.dir).expect("failed to create history directory");
    let engine = Arc::new(ChatEngine::new(store));

    // Ctrl-C stops the listener; in-flight connections finish on their own
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        shutdown.cancel();
    });

    info!(
        "Palaver server starting — chat: {}, history: {}",
        config.server.listen_addr, config.history.dir
    );

    start_listener(&config.server.listen_addr, engine, cancel).await;
}
