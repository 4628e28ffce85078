use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use relay_client::Dispatcher;
use relay_config::RelayConfig;
use relay_history::{HistoryStore, JsonFileSink};
use relay_keys::KeyPool;

mod http;
mod service;
mod split;

use service::ChatService;

/// Credential-rotating relay for the generative-content API.
#[derive(Parser)]
#[command(name = "gemini-relay", version)]
struct Cli {
    /// Path to relay.toml (keys may also come from GEMINI_API_KEY_{i}).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind address from the config.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (output to stderr, initialize only once)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let config = RelayConfig::load(cli.config.as_deref())?;

    let state_dir = config.resolve_state_dir()?;
    let sink = Arc::new(JsonFileSink::new(state_dir.join("history")));
    let store = Arc::new(HistoryStore::with_sink(sink));
    let restored = store
        .load()
        .await
        .context("Failed to load persisted histories")?;

    let pool = Arc::new(KeyPool::new(config.keys.clone()));
    let dispatcher = Dispatcher::new(Arc::clone(&pool), &config.proxies, config.base_url.clone())?;
    let service = Arc::new(ChatService::new(
        dispatcher,
        Arc::clone(&store),
        config.model.clone(),
    ));

    info!(
        keys = pool.len(),
        proxies = config.proxies.len(),
        actors = restored,
        model = %config.model,
        "relay initialized"
    );

    let bind = cli.bind.unwrap_or_else(|| config.bind.clone());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(bind = %bind, "serving");

    axum::serve(listener, http::router(service))
        .await
        .context("server error")?;
    Ok(())
}
