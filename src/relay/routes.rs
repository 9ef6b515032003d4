//! Route table mapping source channels to their destinations.
//!
//! Built once when the Discord cache is ready and immutable afterwards.
//! Route changes require a restart.

use std::collections::{BTreeMap, HashMap};

use serenity::model::id::{ChannelId, GuildId};
use tracing::{debug, info, warn};

use crate::common::error::RouteError;
use crate::config::types::{Config, LaneConfig};

/// Read-only view of the platform's guilds and channels.
pub trait ChannelDirectory {
    /// Whether the guild is known to the bot.
    fn has_guild(&self, guild: GuildId) -> bool;

    /// Whether the channel exists in the guild.
    fn has_channel(&self, guild: GuildId, channel: ChannelId) -> bool;

    /// Whether the channel exists in the guild and accepts text posts.
    fn is_postable(&self, guild: GuildId, channel: ChannelId) -> bool;
}

/// Destinations for messages posted in a single source channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRoute {
    /// Lane name, for logging.
    pub lane: String,
    /// Channel receiving a verbatim copy.
    pub direct_target: Option<ChannelId>,
    /// Filter key -> channel receiving messages that pass the key's gate.
    pub filtered_targets: BTreeMap<String, ChannelId>,
    /// Whether messages are broadcast to socket subscribers.
    pub fan_out: bool,
    /// Socket frame discriminator.
    pub type_tag: u8,
}

impl ChannelRoute {
    fn is_empty(&self) -> bool {
        self.direct_target.is_none() && self.filtered_targets.is_empty() && !self.fan_out
    }
}

/// Immutable source channel -> route index.
#[derive(Debug, Clone)]
pub struct RouteTable {
    source_guild: GuildId,
    score_channel: ChannelId,
    routes: HashMap<ChannelId, ChannelRoute>,
}

impl RouteTable {
    /// Resolve the configured lanes against the platform directory.
    ///
    /// A missing source guild or score channel is fatal. Every other
    /// unresolvable lane or filtered target is skipped with a warning.
    pub fn build(config: &Config, directory: &impl ChannelDirectory) -> Result<Self, RouteError> {
        let source_guild = GuildId::new(config.discord.source_guild);
        if !directory.has_guild(source_guild) {
            return Err(RouteError::SourceGuildNotFound {
                guild_id: config.discord.source_guild,
            });
        }

        let score_channel = match config.relay.score_lane() {
            Some(lane) if directory.has_channel(source_guild, ChannelId::new(lane.source)) => {
                ChannelId::new(lane.source)
            }
            lane => {
                return Err(RouteError::ScoreChannelNotFound {
                    lane: config.relay.score_lane.clone(),
                    channel_id: lane.map(|l| l.source).unwrap_or_default(),
                })
            }
        };

        let target_guild = config.discord.target_guild.map(GuildId::new).filter(|guild| {
            let known = directory.has_guild(*guild);
            if !known {
                warn!("Target guild {} not found, direct copies disabled", guild);
            }
            known
        });

        let mut routes = HashMap::new();
        for lane in &config.relay.lanes {
            let source = ChannelId::new(lane.source);
            if !directory.has_channel(source_guild, source) {
                warn!("Skipping lane '{}': source channel {} not found", lane.name, source);
                continue;
            }

            let mut route = ChannelRoute {
                lane: lane.name.clone(),
                direct_target: resolve_direct_target(lane, target_guild, directory),
                filtered_targets: BTreeMap::new(),
                fan_out: lane.fan_out,
                type_tag: lane.type_id,
            };

            if source == score_channel {
                route.filtered_targets = resolve_filtered_targets(config, directory);
            }

            if route.is_empty() {
                debug!("Lane '{}' has no destinations, not routed", lane.name);
                continue;
            }

            info!(
                lane = %lane.name,
                direct = ?route.direct_target,
                filtered = route.filtered_targets.len(),
                fan_out = route.fan_out,
                "Routing source channel {}",
                source
            );
            routes.insert(source, route);
        }

        info!("Route table built with {} source channels", routes.len());

        Ok(Self {
            source_guild,
            score_channel,
            routes,
        })
    }

    /// Route for a source channel, if any.
    pub fn lookup(&self, channel: ChannelId) -> Option<&ChannelRoute> {
        self.routes.get(&channel)
    }

    pub fn source_guild(&self) -> GuildId {
        self.source_guild
    }

    pub fn score_channel(&self) -> ChannelId {
        self.score_channel
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn resolve_direct_target(
    lane: &LaneConfig,
    target_guild: Option<GuildId>,
    directory: &impl ChannelDirectory,
) -> Option<ChannelId> {
    let target = ChannelId::new(lane.target?);
    let guild = target_guild?;
    if directory.is_postable(guild, target) {
        Some(target)
    } else {
        warn!(
            "Lane '{}': target channel {} is missing or not a text channel",
            lane.name, target
        );
        None
    }
}

fn resolve_filtered_targets(
    config: &Config,
    directory: &impl ChannelDirectory,
) -> BTreeMap<String, ChannelId> {
    let mut targets = BTreeMap::new();
    for (key, target) in &config.relay.filtered {
        let guild = GuildId::new(target.guild);
        let channel = ChannelId::new(target.channel);
        if !directory.has_guild(guild) {
            warn!("Filtered target '{}': guild {} not found", key, guild);
            continue;
        }
        if !directory.is_postable(guild, channel) {
            warn!(
                "Filtered target '{}': channel {} is missing or not a text channel",
                key, channel
            );
            continue;
        }
        targets.insert(key.clone(), channel);
    }
    targets
}
