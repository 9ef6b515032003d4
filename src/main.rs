//! Herald - Discord channel relay
//!
//! Copies messages from the channels of a source guild into target
//! channels, broadcasts them to websocket subscribers and records score
//! announcements in MySQL.

mod common;
mod config;
mod discord;
mod fanout;
mod relay;
mod score;
mod storage;

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info, warn};

use config::types::DatabaseConfig;
use config::{env::get_config_path, load_and_validate};
use discord::DiscordBot;
use fanout::FanOutManager;
use score::ScoreTracker;
use storage::mysql::MySqlStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Herald v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Source guild: {}", config.discord.source_guild);
    info!("  Lanes: {}", config.relay.lanes.len());
    info!("  Filtered targets: {}", config.relay.filtered.len());
    info!("  Socket endpoints: {}", config.sockets.endpoints.len());

    let scores = match &config.database {
        Some(database) => open_score_tracker(database).await,
        None => {
            warn!("No database configured - score persistence disabled");
            None
        }
    };

    let fanout = FanOutManager::start(&config.sockets);

    info!("Starting Discord bot...");
    let discord_bot = DiscordBot::build(config, fanout, scores).await?;

    tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
        result = discord_bot.run() => {
            if let Err(e) = result {
                error!("Relay stopped: {:#}", e);
                return Err(e);
            }
        }
    }

    info!("Exiting...");
    Ok(())
}

/// Connect the score store and start loading the map registry.
///
/// A database that cannot be reached disables persistence; relaying runs
/// regardless.
async fn open_score_tracker(database: &DatabaseConfig) -> Option<ScoreTracker> {
    let store = match MySqlStore::connect(&database.url, database.max_connections).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to connect to score database: {}", e);
            return None;
        }
    };
    if let Err(e) = store.ensure_schema().await {
        error!("Failed to prepare score tables: {}", e);
        return None;
    }

    let tracker = ScoreTracker::new(Arc::new(store));
    tracker.spawn_load();
    Some(tracker)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
