//! MySQL-backed score store.

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tracing::info;

use crate::common::error::{PersistenceError, PersistenceResult};
use crate::storage::{MapId, ScoreEvent, ScoreStore};

const CREATE_MAP_IDS: &str = r#"
CREATE TABLE IF NOT EXISTS map_ids (
    id INT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(255) NOT NULL UNIQUE
)"#;

const CREATE_SCORE_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS score_events (
    id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
    clan VARCHAR(255) NOT NULL,
    points BIGINT NOT NULL,
    contest BOOLEAN NOT NULL,
    map_id INT UNSIGNED NOT NULL,
    score_old BIGINT NOT NULL,
    score_new BIGINT NOT NULL,
    timestamp DATETIME NOT NULL,
    INDEX idx_score_events_map (map_id),
    INDEX idx_score_events_timestamp (timestamp)
)"#;

/// Score store on a MySQL connection pool.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Connect a pool to the given database URL.
    pub async fn connect(url: &str, max_connections: u32) -> PersistenceResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!("Connected to score database");
        Ok(Self { pool })
    }

    /// Create the tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> PersistenceResult<()> {
        sqlx::query(CREATE_MAP_IDS).execute(&self.pool).await?;
        sqlx::query(CREATE_SCORE_EVENTS).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ScoreStore for MySqlStore {
    async fn load_map_ids(&self) -> PersistenceResult<Vec<(MapId, String)>> {
        let rows = sqlx::query_as::<_, (MapId, String)>("SELECT id, name FROM map_ids")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert_map_id(&self, name: &str) -> PersistenceResult<MapId> {
        let result = sqlx::query("INSERT INTO map_ids (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;
        let id = result.last_insert_id();
        MapId::try_from(id).map_err(|_| PersistenceError::InvalidId { id })
    }

    async fn insert_score_event(&self, event: &ScoreEvent) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO score_events \
             (clan, points, contest, map_id, score_old, score_new, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.record.name)
        .bind(event.record.points)
        .bind(event.record.is_contest)
        .bind(event.map_id)
        .bind(event.record.score_old)
        .bind(event.record.score_new)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
