//! Score persistence.
//!
//! The relay only talks to storage through [`ScoreStore`], so the MySQL
//! backend can be swapped or stubbed out.

pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::error::PersistenceResult;
use crate::score::parser::ScoreRecord;

/// Numeric id of a map name.
pub type MapId = u32;

/// A score record ready to be written, with its map resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEvent {
    pub record: ScoreRecord,
    pub map_id: MapId,
    pub timestamp: DateTime<Utc>,
}

impl ScoreEvent {
    /// Stamp a record with its map id and the current time.
    pub fn new(record: ScoreRecord, map_id: MapId) -> Self {
        Self {
            record,
            map_id,
            timestamp: Utc::now(),
        }
    }
}

/// Durable storage for map names and score events.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Load every known (id, name) pair.
    async fn load_map_ids(&self) -> PersistenceResult<Vec<(MapId, String)>>;

    /// Insert a new map name and return its id.
    async fn insert_map_id(&self, name: &str) -> PersistenceResult<MapId>;

    /// Append a score event.
    async fn insert_score_event(&self, event: &ScoreEvent) -> PersistenceResult<()>;
}
