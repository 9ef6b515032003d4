//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use std::collections::HashSet;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Discord
    if config.discord.token.is_empty() {
        errors.push("discord.token is required".to_string());
    }
    if config.discord.token == "YOUR_DISCORD_TOKEN_HERE" {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }
    if config.discord.source_guild == 0 {
        errors.push("discord.source_guild must be non-zero".to_string());
    }
    if config.discord.target_guild == Some(0) {
        errors.push("discord.target_guild must be non-zero".to_string());
    }

    // Lanes
    let mut names = HashSet::new();
    let mut sources = HashSet::new();
    for (i, lane) in config.relay.lanes.iter().enumerate() {
        if lane.name.is_empty() {
            errors.push(format!("relay.lanes[{}].name is required", i));
        } else if !names.insert(lane.name.as_str()) {
            errors.push(format!("relay.lanes[{}].name '{}' is duplicated", i, lane.name));
        }
        if lane.source == 0 {
            errors.push(format!("relay.lanes[{}].source must be non-zero", i));
        } else if !sources.insert(lane.source) {
            errors.push(format!(
                "relay.lanes[{}].source {} is used by another lane",
                i, lane.source
            ));
        }
        if lane.target == Some(0) {
            errors.push(format!("relay.lanes[{}].target must be non-zero", i));
        }
    }
    if config.relay.score_lane().is_none() {
        errors.push(format!(
            "relay.score_lane '{}' does not name a configured lane",
            config.relay.score_lane
        ));
    }

    let mut gates = HashSet::new();
    for (key, target) in &config.relay.filtered {
        if key.trim().is_empty() {
            errors.push("relay.filtered contains an empty key".to_string());
        } else if !gates.insert(key.to_uppercase()) {
            errors.push(format!("relay.filtered.{} duplicates another key", key));
        }
        if target.guild == 0 || target.channel == 0 {
            errors.push(format!("relay.filtered.{} must have non-zero guild and channel", key));
        }
    }

    // Sockets
    if !config.sockets.endpoints.is_empty() && config.sockets.secret.is_empty() {
        errors.push("sockets.secret is required when endpoints are configured".to_string());
    }
    for (i, endpoint) in config.sockets.endpoints.iter().enumerate() {
        if !endpoint.starts_with("ws://") && !endpoint.starts_with("wss://") {
            errors.push(format!(
                "sockets.endpoints[{}] '{}' must start with ws:// or wss://",
                i, endpoint
            ));
        }
    }
    if config.sockets.retry_cooldown_secs == 0 {
        errors.push("sockets.retry_cooldown_secs must be non-zero".to_string());
    }
    if config.sockets.connect_timeout_ms == 0 {
        errors.push("sockets.connect_timeout_ms must be non-zero".to_string());
    }
    if config.sockets.outbox_capacity == 0 {
        errors.push("sockets.outbox_capacity must be non-zero".to_string());
    }

    // Database
    if let Some(ref database) = config.database {
        if database.url.is_empty() {
            errors.push("database.url is required".to_string());
        }
        if database.max_connections == 0 {
            errors.push("database.max_connections must be non-zero".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
