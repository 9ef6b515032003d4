//! Canonical message types shared between the Discord adapter and the relay.

use serenity::model::id::{ChannelId, GuildId};

/// A chat message received from the source community.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Guild the message was posted in (None for direct messages).
    pub guild_id: Option<GuildId>,
    /// Channel the message was posted in.
    pub channel_id: ChannelId,
    /// Raw message content.
    pub text: String,
}

impl InboundMessage {
    pub fn new(guild_id: Option<GuildId>, channel_id: ChannelId, text: impl Into<String>) -> Self {
        Self {
            guild_id,
            channel_id,
            text: text.into(),
        }
    }
}
