//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {message}")]
    IoError { path: String, message: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Fatal errors raised while building the route table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("Source guild not found: {guild_id}")]
    SourceGuildNotFound { guild_id: u64 },

    #[error("Score channel '{lane}' not found: {channel_id}")]
    ScoreChannelNotFound { lane: String, channel_id: u64 },
}

/// Reasons a score line does not match the announcement grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreParseReason {
    MismatchedMarkup,
    MissingName,
    MissingPoints,
    InvalidPoints,
    MissingMap,
    MissingScores,
    InvalidScore,
}

impl std::fmt::Display for ScoreParseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::MismatchedMarkup => "mismatched markup",
            Self::MissingName => "missing name",
            Self::MissingPoints => "missing points",
            Self::InvalidPoints => "invalid points",
            Self::MissingMap => "missing map name",
            Self::MissingScores => "missing score bracket",
            Self::InvalidScore => "invalid score value",
        };
        f.write_str(text)
    }
}

/// A chat line that is not a score announcement.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unparseable score line ({reason}): {line:?}")]
pub struct ScoreParseError {
    pub line: String,
    pub reason: ScoreParseReason,
}

/// Persistence-related errors.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Map registry is not ready")]
    NotReady,

    #[error("Map id {id} out of range")]
    InvalidId { id: u64 },
}

/// Socket fan-out errors.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("No websocket handshake within {}s", .after.as_secs_f64())]
    ConnectTimeout { after: std::time::Duration },
}

/// Discord-related errors.
#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("Serenity error: {0}")]
    Serenity(#[from] serenity::Error),
}

/// Failure to turn a chat line into a stored score event.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Parse(#[from] ScoreParseError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Result type alias for persistence operations.
pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;

/// Result type alias for Discord operations.
pub type DiscordResult<T> = std::result::Result<T, DiscordError>;
