//! Per-message relay control flow.
//!
//! For each inbound message on a routed channel the dispatcher starts up to
//! four independent steps: the direct copy, the filtered copies, the socket
//! broadcast and, on the score channel, score persistence. Sends and writes
//! run as detached tasks; a failure in one never affects the others.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::model::id::ChannelId;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::common::error::{DiscordResult, PersistenceError, ScoreError};
use crate::common::InboundMessage;
use crate::fanout::FanOutManager;
use crate::relay::routes::RouteTable;
use crate::score::ScoreTracker;

/// Outbound text sends to the chat platform.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send_text(&self, channel: ChannelId, text: &str) -> DiscordResult<()>;
}

/// Whether a message passes the gate of a filtered target.
///
/// Only the key is upper-cased; the message is matched as-is.
pub fn passes_filter(text: &str, key: &str) -> bool {
    text.contains(&format!("    {} [", key.to_uppercase()))
}

/// Handles to the tasks started for one message.
#[derive(Debug, Default)]
pub struct Dispatched {
    tasks: Vec<JoinHandle<()>>,
}

impl Dispatched {
    /// Number of detached sends and writes started.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every started task to finish.
    pub async fn settled(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Relay task panicked: {}", e);
            }
        }
    }
}

/// Routes inbound messages to their destinations.
pub struct RelayDispatcher {
    routes: Arc<RouteTable>,
    sink: Arc<dyn MessageSink>,
    fanout: FanOutManager,
    scores: Option<ScoreTracker>,
}

impl RelayDispatcher {
    pub fn new(
        routes: Arc<RouteTable>,
        sink: Arc<dyn MessageSink>,
        fanout: FanOutManager,
        scores: Option<ScoreTracker>,
    ) -> Self {
        Self {
            routes,
            sink,
            fanout,
            scores,
        }
    }

    /// Relay a message. Returns without waiting for any send to complete.
    pub fn dispatch(&self, message: &InboundMessage) -> Dispatched {
        let mut dispatched = Dispatched::default();

        if message.guild_id != Some(self.routes.source_guild()) {
            return dispatched;
        }
        let Some(route) = self.routes.lookup(message.channel_id) else {
            return dispatched;
        };

        debug!(lane = %route.lane, "Relaying message from {}", message.channel_id);

        if let Some(target) = route.direct_target {
            dispatched.tasks.push(self.spawn_send(target, &route.lane, &message.text));
        }

        for (key, target) in &route.filtered_targets {
            if passes_filter(&message.text, key) {
                dispatched.tasks.push(self.spawn_send(*target, key, &message.text));
            }
        }

        if route.fan_out {
            self.fanout.broadcast(route.type_tag, &message.text);
        }

        if message.channel_id == self.routes.score_channel() {
            match &self.scores {
                Some(scores) => dispatched.tasks.push(spawn_record(scores.clone(), &message.text)),
                None => debug!("Score persistence disabled, not recording"),
            }
        }

        dispatched
    }

    fn spawn_send(&self, target: ChannelId, label: &str, text: &str) -> JoinHandle<()> {
        let sink = self.sink.clone();
        let label = label.to_string();
        let text = text.to_string();
        tokio::spawn(async move {
            match sink.send_text(target, &text).await {
                Ok(()) => debug!("Relayed to '{}' ({})", label, target),
                Err(e) => error!("Failed to send message to '{}' ({}): {}", label, target, e),
            }
        })
    }
}

fn spawn_record(scores: ScoreTracker, text: &str) -> JoinHandle<()> {
    let text = text.to_string();
    tokio::spawn(async move {
        match scores.record(&text).await {
            Ok(event) => debug!(
                name = %event.record.name,
                map_id = event.map_id,
                points = event.record.points,
                "Recorded score event"
            ),
            Err(ScoreError::Parse(e)) => warn!("{}", e),
            Err(ScoreError::Persistence(PersistenceError::NotReady)) => {
                debug!("Map registry not ready, score line skipped")
            }
            Err(ScoreError::Persistence(e)) => error!("Failed to store score event: {}", e),
        }
    })
}
