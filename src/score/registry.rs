//! Map name to id cache.
//!
//! Seeded from the store at startup. Unknown names are inserted into the
//! store first and cached only once the store has assigned their id, so the
//! cache never holds an id the database does not know about.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::common::error::{PersistenceError, PersistenceResult};
use crate::storage::{MapId, ScoreStore};

/// Load state of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Initial load has not completed.
    Loading,
    /// Initial load succeeded.
    Ready,
    /// Initial load failed; the registry stays unusable until restart.
    Failed,
}

#[derive(Debug)]
struct Maps {
    readiness: Readiness,
    by_name: HashMap<String, MapId>,
}

/// Cache of map names backed by a [`ScoreStore`].
pub struct MapRegistry {
    store: Arc<dyn ScoreStore>,
    maps: RwLock<Maps>,
    /// Serializes inserts so a name is only ever inserted once per process.
    insert_lock: Mutex<()>,
}

impl MapRegistry {
    pub fn new(store: Arc<dyn ScoreStore>) -> Self {
        Self {
            store,
            maps: RwLock::new(Maps {
                readiness: Readiness::Loading,
                by_name: HashMap::new(),
            }),
            insert_lock: Mutex::new(()),
        }
    }

    /// Load every known map from the store.
    ///
    /// On failure the registry is marked [`Readiness::Failed`] for good.
    pub async fn load(&self) -> PersistenceResult<usize> {
        match self.store.load_map_ids().await {
            Ok(rows) => {
                let mut maps = self.maps.write().await;
                maps.by_name.extend(rows.into_iter().map(|(id, name)| (name, id)));
                maps.readiness = Readiness::Ready;
                info!("Map registry loaded with {} maps", maps.by_name.len());
                Ok(maps.by_name.len())
            }
            Err(e) => {
                self.maps.write().await.readiness = Readiness::Failed;
                error!("Failed to load map registry, score persistence disabled: {}", e);
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub async fn readiness(&self) -> Readiness {
        self.maps.read().await.readiness
    }

    pub async fn id_of(&self, name: &str) -> Option<MapId> {
        self.maps.read().await.by_name.get(name).copied()
    }

    /// Resolve a map name to its id, inserting it into the store on first sight.
    pub async fn resolve(&self, name: &str) -> PersistenceResult<MapId> {
        {
            let maps = self.maps.read().await;
            if maps.readiness != Readiness::Ready {
                return Err(PersistenceError::NotReady);
            }
            if let Some(id) = maps.by_name.get(name) {
                return Ok(*id);
            }
        }

        let _guard = self.insert_lock.lock().await;

        // Another caller may have inserted it while we waited
        if let Some(id) = self.id_of(name).await {
            return Ok(id);
        }

        let id = self.store.insert_map_id(name).await?;
        debug!("Registered new map '{}' as {}", name, id);
        self.maps.write().await.by_name.insert(name.to_string(), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::storage::testing::MemoryStore;

    async fn loaded(store: Arc<MemoryStore>) -> MapRegistry {
        let registry = MapRegistry::new(store);
        registry.load().await.unwrap();
        registry
    }

    #[tokio::test]
    async fn test_load_seeds_known_maps() {
        let store = Arc::new(MemoryStore::with_maps(&[(1, "Great Run"), (2, "Quarry")]));
        let registry = loaded(store).await;

        assert_eq!(registry.readiness().await, Readiness::Ready);
        assert_eq!(registry.id_of("Quarry").await, Some(2));
        assert_eq!(registry.id_of("Great Run").await, Some(1));
    }

    #[tokio::test]
    async fn test_not_ready_before_load() {
        let registry = MapRegistry::new(Arc::new(MemoryStore::default()));
        assert_eq!(registry.readiness().await, Readiness::Loading);
        assert!(matches!(registry.resolve("Quarry").await, Err(PersistenceError::NotReady)));
    }

    #[tokio::test]
    async fn test_failed_load_disables_registry() {
        let store = Arc::new(MemoryStore::default());
        store.fail_load.store(true, Ordering::SeqCst);
        let registry = MapRegistry::new(store.clone());

        assert!(registry.load().await.is_err());
        assert_eq!(registry.readiness().await, Readiness::Failed);
        assert!(matches!(registry.resolve("Quarry").await, Err(PersistenceError::NotReady)));
        assert_eq!(store.map_inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_known_name_does_not_insert() {
        let store = Arc::new(MemoryStore::with_maps(&[(4, "Quarry")]));
        let registry = loaded(store.clone()).await;

        assert_eq!(registry.resolve("Quarry").await.unwrap(), 4);
        assert_eq!(store.map_inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_name_inserted_once() {
        let store = Arc::new(MemoryStore::with_maps(&[(1, "Great Run")]));
        let registry = loaded(store.clone()).await;

        let first = registry.resolve("Quarry").await.unwrap();
        let second = registry.resolve("Quarry").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, 2);
        assert_eq!(store.map_inserts.load(Ordering::SeqCst), 1);
        assert_eq!(registry.id_of("Quarry").await, Some(2));
    }

    #[tokio::test]
    async fn test_concurrent_misses_insert_once() {
        let store = Arc::new(MemoryStore::default());
        let registry = Arc::new(loaded(store.clone()).await);

        let a = tokio::spawn({
            let registry = registry.clone();
            async move { registry.resolve("Quarry").await }
        });
        let b = tokio::spawn({
            let registry = registry.clone();
            async move { registry.resolve("Quarry").await }
        });

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(store.map_inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_insert_is_not_cached() {
        let store = Arc::new(MemoryStore::default());
        let registry = loaded(store.clone()).await;

        store.fail_insert.store(true, Ordering::SeqCst);
        assert!(registry.resolve("Quarry").await.is_err());
        assert_eq!(registry.id_of("Quarry").await, None);

        store.fail_insert.store(false, Ordering::SeqCst);
        assert_eq!(registry.resolve("Quarry").await.unwrap(), 1);
        assert_eq!(store.map_inserts.load(Ordering::SeqCst), 2);
    }
}
