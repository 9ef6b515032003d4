//! Score announcement persistence.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::common::error::ScoreError;
use crate::score::parser::parse_score_line;
use crate::score::registry::MapRegistry;
use crate::storage::{ScoreEvent, ScoreStore};

/// Parses score lines and writes them to the store.
#[derive(Clone)]
pub struct ScoreTracker {
    registry: Arc<MapRegistry>,
    store: Arc<dyn ScoreStore>,
}

impl ScoreTracker {
    pub fn new(store: Arc<dyn ScoreStore>) -> Self {
        Self {
            registry: Arc::new(MapRegistry::new(store.clone())),
            store,
        }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &Arc<MapRegistry> {
        &self.registry
    }

    /// Load the map registry in the background.
    pub fn spawn_load(&self) -> JoinHandle<()> {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            // Failure is logged by the registry and leaves it disabled
            let _ = registry.load().await;
        })
    }

    /// Parse a line, resolve its map and store the resulting event.
    pub async fn record(&self, line: &str) -> Result<ScoreEvent, ScoreError> {
        let record = parse_score_line(line)?;
        let map_id = self.registry.resolve(&record.map_name).await?;
        let event = ScoreEvent::new(record, map_id);
        self.store.insert_score_event(&event).await?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::common::error::PersistenceError;
    use crate::storage::testing::MemoryStore;

    const LINE: &str = "**Raiders    120    Great Run [5.1234->6.0567]**";

    async fn tracker(store: Arc<MemoryStore>) -> ScoreTracker {
        let tracker = ScoreTracker::new(store);
        tracker.spawn_load().await.unwrap();
        tracker
    }

    #[tokio::test]
    async fn test_record_writes_event() {
        let store = Arc::new(MemoryStore::with_maps(&[(3, "Great Run")]));
        let tracker = tracker(store.clone()).await;

        let event = assert_ok!(tracker.record(LINE).await);
        assert_eq!(event.map_id, 3);
        assert_eq!(event.record.points, 120);
        assert_eq!(store.events(), vec![event]);
    }

    #[tokio::test]
    async fn test_parse_failure_writes_nothing() {
        let store = Arc::new(MemoryStore::default());
        let tracker = tracker(store.clone()).await;

        let err = assert_err!(tracker.record("just chatting").await);
        assert!(matches!(err, ScoreError::Parse(_)));
        assert!(store.events().is_empty());
        assert_eq!(store.map_inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unready_registry_skips_write() {
        let store = Arc::new(MemoryStore::default());
        store.fail_load.store(true, Ordering::SeqCst);
        let tracker = tracker(store.clone()).await;

        let err = tracker.record(LINE).await.unwrap_err();
        assert!(matches!(err, ScoreError::Persistence(PersistenceError::NotReady)));
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let store = Arc::new(MemoryStore::default());
        let tracker = tracker(store.clone()).await;
        store.fail_write.store(true, Ordering::SeqCst);

        let err = tracker.record(LINE).await.unwrap_err();
        assert!(matches!(err, ScoreError::Persistence(PersistenceError::Database(_))));
        // The map was still registered
        assert_eq!(tracker.registry().id_of("Great Run").await, Some(1));
    }
}
