//! Discord bot integration.
//!
//! This module connects to Discord, builds the route table once the guild
//! cache is populated and feeds every message into the relay dispatcher.

pub mod client;
pub mod directory;

pub use client::DiscordBot;
