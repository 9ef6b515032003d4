//! Discord bot client.
//!
//! Serenity events are forwarded into a channel and handled by a single
//! loop, so messages are dispatched one at a time in arrival order.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use backon::BackoffBuilder;
use serenity::async_trait;
use serenity::http::HttpBuilder;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::common::InboundMessage;
use crate::config::types::Config;
use crate::discord::directory::HttpSink;
use crate::fanout::FanOutManager;
use crate::relay::{RelayDispatcher, RouteTable};
use crate::score::ScoreTracker;

#[derive(Debug, Clone)]
pub enum DiscordBotEvent {
    /// Every guild is in the cache.
    CacheReady { context: Context },
    /// Message received.
    Message { context: Context, message: Message },
    Disconnected,
}

struct DiscordBotEvents {
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
}

impl DiscordBotEvents {
    fn new(discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>) -> Self {
        Self { discord_events_tx }
    }

    fn forward(&self, event: DiscordBotEvent) {
        if let Err(error) = self.discord_events_tx.send(event) {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

#[async_trait]
impl EventHandler for DiscordBotEvents {
    async fn ready(&self, _context: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);
    }

    async fn cache_ready(&self, context: Context, guilds: Vec<GuildId>) {
        info!("Discord cache ready with {} guilds", guilds.len());
        self.forward(DiscordBotEvent::CacheReady { context });
    }

    async fn message(&self, context: Context, message: Message) {
        self.forward(DiscordBotEvent::Message { context, message });
    }
}

async fn build_client(
    token: &str,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
) -> anyhow::Result<Client> {
    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    // Build a custom reqwest client with timeout settings
    let reqwest_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let http = HttpBuilder::new(token).client(reqwest_client).build();

    let events = DiscordBotEvents::new(discord_events_tx);
    let client = serenity::client::ClientBuilder::new_with_http(http, intents)
        .event_handler(events)
        .await?;
    Ok(client)
}

/// Create an exponential backoff iterator for Discord reconnection.
/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn discord_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

/// The relay's Discord side.
pub struct DiscordBot {
    client: Option<Client>,
    token: String,
    config: Config,
    fanout: FanOutManager,
    scores: Option<ScoreTracker>,
    discord_events_rx: mpsc::UnboundedReceiver<DiscordBotEvent>,
    discord_events_tx: mpsc::UnboundedSender<DiscordBotEvent>,
}

impl DiscordBot {
    /// Build the Discord client. Nothing connects until [`DiscordBot::run`].
    pub async fn build(
        config: Config,
        fanout: FanOutManager,
        scores: Option<ScoreTracker>,
    ) -> anyhow::Result<Self> {
        let (discord_events_tx, discord_events_rx) = mpsc::unbounded_channel::<DiscordBotEvent>();
        let token = config.discord.token.clone();
        let client = build_client(&token, discord_events_tx.clone()).await?;

        Ok(Self {
            client: Some(client),
            token,
            config,
            fanout,
            scores,
            discord_events_rx,
            discord_events_tx,
        })
    }

    /// Run until the gateway stops for good or routing cannot be set up.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let client = &mut self.client;
        let relay = RelayLoop {
            config: &self.config,
            fanout: &self.fanout,
            scores: &self.scores,
        };

        let result = tokio::select! {
            _ = Self::run_connection(client, &self.token, &self.discord_events_tx) => Ok(()),
            result = relay.process_events(&mut self.discord_events_rx) => result,
        };
        info!("Discord task ended");
        result
    }

    async fn run_connection(
        client: &mut Option<Client>,
        token: &str,
        discord_events_tx: &mpsc::UnboundedSender<DiscordBotEvent>,
    ) {
        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let mut client = match client.take() {
                Some(client) => client,
                None => {
                    // serenity mostly handles reconnections itself.
                    match build_client(token, discord_events_tx.clone()).await {
                        Ok(client) => {
                            backoff = discord_backoff();
                            client
                        }
                        Err(e) => {
                            error!("Failed to rebuild Discord client: {}", e);
                            let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                            warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                            sleep(delay).await;
                            continue;
                        }
                    }
                }
            };

            match client.start().await {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                        warn!("Failed to process discord event: {}", error);
                    }
                    break;
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(Duration::from_secs(300));
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64(),
                    );
                    if let Err(error) = discord_events_tx.send(DiscordBotEvent::Disconnected) {
                        warn!("Failed to process discord event: {}", error);
                    }
                    sleep(delay).await;
                }
            }
        }
    }
}

/// The single consumer of Discord events.
struct RelayLoop<'a> {
    config: &'a Config,
    fanout: &'a FanOutManager,
    scores: &'a Option<ScoreTracker>,
}

impl RelayLoop<'_> {
    async fn process_events(
        &self,
        discord_events_rx: &mut mpsc::UnboundedReceiver<DiscordBotEvent>,
    ) -> anyhow::Result<()> {
        let mut dispatcher: Option<RelayDispatcher> = None;

        while let Some(event) = discord_events_rx.recv().await {
            match event {
                DiscordBotEvent::CacheReady { context } => {
                    if dispatcher.is_some() {
                        debug!("Cache ready after reconnect, keeping existing routes");
                        continue;
                    }
                    dispatcher = Some(self.build_dispatcher(&context)?);
                }
                DiscordBotEvent::Message { context, message } => {
                    if message.author.id == context.cache.current_user().id {
                        continue;
                    }
                    match dispatcher.as_ref() {
                        Some(dispatcher) => {
                            let inbound = InboundMessage::new(
                                message.guild_id,
                                message.channel_id,
                                message.content,
                            );
                            // Sends run detached; the handles are only counted
                            let dispatched = dispatcher.dispatch(&inbound);
                            if !dispatched.is_empty() {
                                debug!("Started {} relay tasks", dispatched.len());
                            }
                        }
                        None => debug!("Dropping message - routes not built yet"),
                    }
                }
                DiscordBotEvent::Disconnected => {
                    debug!("Discord gateway disconnected");
                }
            }
        }

        debug!("Discord events channel closed.");
        Ok(())
    }

    fn build_dispatcher(&self, context: &Context) -> anyhow::Result<RelayDispatcher> {
        let routes = RouteTable::build(self.config, &*context.cache)
            .context("Failed to build route table")?;
        if routes.is_empty() {
            warn!("No lane resolved to a destination, nothing will be relayed");
        }
        let sink = Arc::new(HttpSink::new(context.http.clone()));
        Ok(RelayDispatcher::new(
            Arc::new(routes),
            sink,
            self.fanout.clone(),
            self.scores.clone(),
        ))
    }
}
