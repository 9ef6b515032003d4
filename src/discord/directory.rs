//! Serenity-backed implementations of the relay's platform collaborators.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::channel::ChannelType;
use serenity::model::id::{ChannelId, GuildId};

use crate::common::error::DiscordResult;
use crate::relay::{ChannelDirectory, MessageSink};

/// Text and announcement channels accept posts.
pub fn is_postable_kind(kind: ChannelType) -> bool {
    matches!(kind, ChannelType::Text | ChannelType::News)
}

impl ChannelDirectory for Cache {
    fn has_guild(&self, guild: GuildId) -> bool {
        self.guild(guild).is_some()
    }

    fn has_channel(&self, guild: GuildId, channel: ChannelId) -> bool {
        self.guild(guild)
            .is_some_and(|guild| guild.channels.contains_key(&channel))
    }

    fn is_postable(&self, guild: GuildId, channel: ChannelId) -> bool {
        self.guild(guild).is_some_and(|guild| {
            guild
                .channels
                .get(&channel)
                .is_some_and(|channel| is_postable_kind(channel.kind))
        })
    }
}

/// Sends relayed text through the Discord HTTP API.
pub struct HttpSink {
    http: Arc<Http>,
}

impl HttpSink {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MessageSink for HttpSink {
    async fn send_text(&self, channel: ChannelId, text: &str) -> DiscordResult<()> {
        channel.say(&self.http, text).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postable_kinds() {
        assert!(is_postable_kind(ChannelType::Text));
        assert!(is_postable_kind(ChannelType::News));
        assert!(!is_postable_kind(ChannelType::Voice));
        assert!(!is_postable_kind(ChannelType::Category));
        assert!(!is_postable_kind(ChannelType::Forum));
    }
}
