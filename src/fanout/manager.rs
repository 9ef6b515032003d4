//! Fan-out of relayed messages to every open socket subscriber.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::types::SocketsConfig;
use crate::fanout::connection::{run_connection, Connection, ConnectionSettings};
use crate::fanout::wire::RelayFrame;

/// Owns one reconnecting connection per configured endpoint.
#[derive(Debug, Clone, Default)]
pub struct FanOutManager {
    connections: Vec<Arc<Connection>>,
}

impl FanOutManager {
    /// Spawn a connection task for every configured endpoint.
    pub fn start(config: &SocketsConfig) -> Self {
        let settings = ConnectionSettings {
            handshake_delay: Duration::from_millis(config.handshake_delay_ms),
            retry_cooldown: Duration::from_secs(config.retry_cooldown_secs),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            secret: config.secret.clone(),
        };

        let connections = config
            .endpoints
            .iter()
            .map(|endpoint| {
                let (connection, outbox_rx) = Connection::new(
                    endpoint,
                    settings.retry_cooldown,
                    config.outbox_capacity,
                );
                tokio::spawn(run_connection(connection.clone(), outbox_rx, settings.clone()));
                connection
            })
            .collect::<Vec<_>>();

        info!("Started {} socket subscriber connections", connections.len());
        Self { connections }
    }

    /// Build a manager over existing connections without spawning anything.
    #[cfg(test)]
    pub fn from_connections(connections: Vec<Arc<Connection>>) -> Self {
        Self { connections }
    }

    /// Send a relayed message to every open connection.
    ///
    /// Closed connections are skipped; nothing is buffered for them.
    /// Returns the number of connections the frame was queued on.
    pub fn broadcast(&self, type_tag: u8, data: &str) -> usize {
        if self.connections.is_empty() {
            return 0;
        }

        let frame = match serde_json::to_string(&RelayFrame {
            type_id: type_tag,
            data,
        }) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode relay frame: {}", e);
                return 0;
            }
        };

        let sent = self
            .connections
            .iter()
            .filter(|connection| connection.enqueue(frame.clone()))
            .count();
        debug!(type_tag, sent, total = self.connections.len(), "Broadcast relay frame");
        sent
    }

    /// Current state of every connection, in configuration order.
    #[cfg(test)]
    pub fn states(&self) -> Vec<(String, crate::fanout::connection::ConnectionState)> {
        self.connections
            .iter()
            .map(|connection| (connection.endpoint().to_string(), connection.state()))
            .collect()
    }
}
