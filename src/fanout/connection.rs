//! A single reconnecting socket subscriber.
//!
//! Each endpoint is driven by its own task running [`run_connection`]. The
//! task owns the websocket; the rest of the process only sees the
//! [`Connection`] handle, which exposes the state and an outbox.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use backon::BackoffBuilder;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::common::error::SocketError;
use crate::fanout::wire::VerificationFrame;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle of a socket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Open, verification frame scheduled.
    VerificationPending,
    /// Open, verification frame sent.
    Verified,
}

impl ConnectionState {
    /// Whether frames can be written. Verification is not required.
    pub fn is_sendable(self) -> bool {
        matches!(
            self,
            Self::Connected | Self::VerificationPending | Self::Verified
        )
    }
}

/// Timing of the connection loop.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Delay between opening a connection and sending the verification frame.
    pub handshake_delay: Duration,
    /// Minimum time between two attempts on the same endpoint.
    pub retry_cooldown: Duration,
    /// Limit on the TCP connect plus websocket upgrade.
    pub connect_timeout: Duration,
    /// Shared verification secret.
    pub secret: String,
}

#[derive(Debug)]
struct Slot {
    state: ConnectionState,
    last_attempt: Option<Instant>,
}

/// Shared handle to one endpoint.
#[derive(Debug)]
pub struct Connection {
    endpoint: String,
    cooldown: Duration,
    slot: Mutex<Slot>,
    outbox: mpsc::Sender<String>,
    attempts: AtomicU64,
}

impl Connection {
    /// Create a disconnected handle and the receiving end of its outbox.
    ///
    /// The outbox holds at most `capacity` frames.
    pub fn new(
        endpoint: impl Into<String>,
        cooldown: Duration,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (outbox, outbox_rx) = mpsc::channel(capacity);
        let connection = Self {
            endpoint: endpoint.into(),
            cooldown,
            slot: Mutex::new(Slot {
                state: ConnectionState::Disconnected,
                last_attempt: None,
            }),
            outbox,
            attempts: AtomicU64::new(0),
        };
        (Arc::new(connection), outbox_rx)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.slot().state
    }

    pub fn set_state(&self, state: ConnectionState) {
        let mut slot = self.slot();
        if slot.state != state {
            debug!(endpoint = %self.endpoint, "{:?} -> {:?}", slot.state, state);
            slot.state = state;
        }
    }

    /// Number of connection attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Claim the next connection attempt.
    ///
    /// Refused while an attempt is in flight or the socket is open, and
    /// within the cool-down of this endpoint's previous attempt.
    pub fn try_begin_attempt(&self, now: Instant) -> bool {
        let mut slot = self.slot();
        if slot.state != ConnectionState::Disconnected {
            return false;
        }
        if let Some(last) = slot.last_attempt {
            if now.saturating_duration_since(last) < self.cooldown {
                return false;
            }
        }
        slot.state = ConnectionState::Connecting;
        slot.last_attempt = Some(now);
        self.attempts.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Earliest time the next attempt may start.
    pub fn next_eligible(&self) -> Option<Instant> {
        self.slot().last_attempt.map(|last| last + self.cooldown)
    }

    /// Queue a frame if the socket is open. Returns whether it was queued.
    ///
    /// A full outbox drops the frame rather than waiting for the subscriber.
    pub fn enqueue(&self, frame: String) -> bool {
        if !self.state().is_sendable() {
            return false;
        }
        match self.outbox.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(endpoint = %self.endpoint, "Outbox full, dropping frame");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(endpoint = %self.endpoint, "Outbox closed, dropping frame");
                false
            }
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keep an endpoint connected for the lifetime of the process.
pub async fn run_connection(
    connection: Arc<Connection>,
    mut outbox_rx: mpsc::Receiver<String>,
    settings: ConnectionSettings,
) {
    let mut retry = backon::ConstantBuilder::default()
        .with_delay(settings.retry_cooldown)
        .without_max_times()
        .build();

    loop {
        let now = Instant::now();
        if !connection.try_begin_attempt(now) {
            let wait = connection
                .next_eligible()
                .map(|at| at.saturating_duration_since(now))
                .unwrap_or(settings.retry_cooldown);
            sleep(wait).await;
            continue;
        }

        // Frames queued for the previous session are dropped
        while outbox_rx.try_recv().is_ok() {}

        debug!(
            endpoint = %connection.endpoint(),
            attempt = connection.attempts(),
            "Connecting to socket subscriber"
        );
        match open_socket(connection.endpoint(), settings.connect_timeout).await {
            Ok(socket) => {
                info!(endpoint = %connection.endpoint(), "Connected to socket subscriber");
                connection.set_state(ConnectionState::Connected);
                match run_session(&connection, socket, &mut outbox_rx, &settings).await {
                    Ok(()) => info!(endpoint = %connection.endpoint(), "Socket closed"),
                    Err(e) => warn!(endpoint = %connection.endpoint(), "Socket error: {}", e),
                }
            }
            Err(e) => {
                warn!(endpoint = %connection.endpoint(), "Failed to connect: {}", e);
            }
        }

        connection.set_state(ConnectionState::Disconnected);

        let delay = retry.next().unwrap_or(settings.retry_cooldown);
        debug!(
            endpoint = %connection.endpoint(),
            "Reconnecting in {:.1} seconds",
            delay.as_secs_f64()
        );
        sleep(delay).await;
    }
}

/// Connect and complete the websocket upgrade within `limit`.
async fn open_socket(endpoint: &str, limit: Duration) -> Result<Socket, SocketError> {
    match timeout(limit, connect_async(endpoint)).await {
        Ok(result) => Ok(result?.0),
        Err(_) => Err(SocketError::ConnectTimeout { after: limit }),
    }
}

/// Pump outgoing frames until the socket closes.
async fn run_session(
    connection: &Connection,
    socket: Socket,
    outbox_rx: &mut mpsc::Receiver<String>,
    settings: &ConnectionSettings,
) -> Result<(), SocketError> {
    let (mut sink, mut stream) = socket.split();

    connection.set_state(ConnectionState::VerificationPending);
    let handshake = sleep(settings.handshake_delay);
    tokio::pin!(handshake);
    let mut verified = false;

    loop {
        tokio::select! {
            _ = &mut handshake, if !verified => {
                verified = true;
                let frame = serde_json::to_string(&VerificationFrame::new(&settings.secret))?;
                sink.send(Message::text(frame)).await?;
                connection.set_state(ConnectionState::Verified);
                debug!(endpoint = %connection.endpoint(), "Verification sent");
            }
            frame = outbox_rx.recv() => match frame {
                Some(frame) => sink.send(Message::text(frame)).await?,
                None => {
                    let _ = sink.close().await;
                    return Ok(());
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }
}
