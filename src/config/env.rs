//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `HERALD_DISCORD_TOKEN` - Discord bot token
//! - `HERALD_SOURCE_GUILD` - Source guild ID
//! - `HERALD_SOCKET_SECRET` - Shared websocket verification secret
//! - `HERALD_DATABASE_URL` - Score database URL

use std::env;

use crate::config::types::{Config, DatabaseConfig};

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "HERALD";

/// Apply environment variable overrides to a config.
///
/// This allows secrets to be provided via environment variables
/// instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = token;
    }

    if let Ok(guild_id) = env::var(format!("{}_SOURCE_GUILD", ENV_PREFIX)) {
        if let Ok(id) = guild_id.parse() {
            config.discord.source_guild = id;
        }
    }

    if let Ok(secret) = env::var(format!("{}_SOCKET_SECRET", ENV_PREFIX)) {
        config.sockets.secret = secret;
    }

    if let Ok(url) = env::var(format!("{}_DATABASE_URL", ENV_PREFIX)) {
        match config.database.as_mut() {
            Some(database) => database.url = url,
            None => {
                config.database = Some(DatabaseConfig {
                    url,
                    max_connections: 5,
                })
            }
        }
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `HERALD_CONFIG` environment variable, otherwise returns "herald.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "herald.conf".to_string())
}
