//! Configuration file parsing (HOCON format).

use std::fs;
use std::path::Path;

use crate::common::error::ConfigError;
use crate::config::types::Config;
use hocon::HoconLoader;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    load_config_str(&content)
}

/// Load configuration from a HOCON string.
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        discord {
            token = "abc"
            source_guild = 100
            target_guild = 200
        }
        relay {
            score_lane = "clan"
            lanes = [
                { name = "clan", source = 1, target = 2, type_id = 0 },
                { name = "zombie", source = 5, type_id = 2, fan_out = false }
            ]
            filtered {
                raiders { guild = 300, channel = 301 }
            }
        }
        sockets {
            endpoints = ["ws://127.0.0.1:9000"]
            secret = "s3cret"
        }
    "#;

    #[test]
    fn test_load_sample_config() {
        let config = load_config_str(SAMPLE).unwrap();
        assert_eq!(config.discord.source_guild, 100);
        assert_eq!(config.discord.target_guild, Some(200));
        assert_eq!(config.relay.lanes.len(), 2);
        assert!(config.relay.lanes[0].fan_out);
        assert!(!config.relay.lanes[1].fan_out);
        assert_eq!(config.relay.lanes[1].target, None);
        assert_eq!(config.relay.filtered["raiders"].channel, 301);
        assert_eq!(config.sockets.handshake_delay_ms, 1000);
        assert_eq!(config.sockets.retry_cooldown_secs, 5);
        assert_eq!(config.sockets.connect_timeout_ms, 10_000);
        assert_eq!(config.sockets.outbox_capacity, 256);
        assert!(config.database.is_none());
        assert_eq!(config.relay.score_lane().map(|l| l.source), Some(1));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_config("/nonexistent/herald.conf");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }

    #[test]
    fn test_missing_section_fails() {
        let result = load_config_str("discord { token = \"abc\", source_guild = 1 }");
        assert!(result.is_err());
    }
}
