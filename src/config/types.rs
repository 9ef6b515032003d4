//! Configuration type definitions.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    pub relay: RelayConfig,
    #[serde(default)]
    pub sockets: SocketsConfig,
    pub database: Option<DatabaseConfig>,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    /// Community whose channels are relayed.
    pub source_guild: u64,
    /// Community receiving direct copies.
    pub target_guild: Option<u64>,
}

/// Relay lanes and filtered routes.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Name of the lane whose source channel carries score announcements.
    pub score_lane: String,
    pub lanes: Vec<LaneConfig>,
    /// Filter key -> destination, attached to the score lane's source channel.
    #[serde(default)]
    pub filtered: BTreeMap<String, FilteredTargetConfig>,
}

impl RelayConfig {
    /// The lane carrying score announcements, if configured.
    pub fn score_lane(&self) -> Option<&LaneConfig> {
        self.lanes.iter().find(|lane| lane.name == self.score_lane)
    }
}

/// A single source -> target relay lane.
#[derive(Debug, Clone, Deserialize)]
pub struct LaneConfig {
    pub name: String,
    /// Source channel ID in the source guild.
    pub source: u64,
    /// Direct-copy channel ID in the target guild.
    pub target: Option<u64>,
    /// Discriminator used in socket frames.
    pub type_id: u8,
    /// Whether messages on this lane are broadcast to sockets.
    #[serde(default = "default_fan_out")]
    pub fan_out: bool,
}

/// A filtered destination in any guild.
#[derive(Debug, Clone, Deserialize)]
pub struct FilteredTargetConfig {
    pub guild: u64,
    pub channel: u64,
}

/// External socket subscribers.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketsConfig {
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_handshake_delay_ms")]
    pub handshake_delay_ms: u64,
    #[serde(default = "default_retry_cooldown_secs")]
    pub retry_cooldown_secs: u64,
    /// Time allowed for the TCP connect and websocket upgrade together.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Frames queued per connection before new ones are dropped.
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
}

impl Default for SocketsConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            secret: String::new(),
            handshake_delay_ms: default_handshake_delay_ms(),
            retry_cooldown_secs: default_retry_cooldown_secs(),
            connect_timeout_ms: default_connect_timeout_ms(),
            outbox_capacity: default_outbox_capacity(),
        }
    }
}

/// Score persistence database.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_fan_out() -> bool {
    true
}

fn default_handshake_delay_ms() -> u64 {
    1000
}

fn default_retry_cooldown_secs() -> u64 {
    5
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_outbox_capacity() -> usize {
    256
}

fn default_max_connections() -> u32 {
    5
}
