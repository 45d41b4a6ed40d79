// # Memory Entity Store
//
// In-memory implementation of PersistenceGateway.
//
// ## Crash Behavior
//
// - All entities are lost on restart
// - Useful for tests and for embedding the engine in front of another store

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::model::{Entity, EntityId};
use crate::traits::PersistenceGateway;
use crate::Error;

/// In-memory entity store
///
/// Clones share the same underlying map, so a test can keep a handle while
/// the coordinator owns another.
///
/// # Example
///
/// ```rust,no_run
/// use strays_core::model::{Animal, AnimalType, EntityId, SexType};
/// use strays_core::store::MemoryEntityStore;
/// use strays_core::traits::PersistenceGateway;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryEntityStore::new();
///     store.insert(Animal::new(1, AnimalType::Cat, SexType::Female, "Tama")).await;
///
///     let cat = store.fetch_active_by_id(EntityId(1)).await?;
///     assert_eq!(cat.map(|c| c.name), Some("Tama".to_string()));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryEntityStore<E> {
    inner: Arc<RwLock<HashMap<EntityId, E>>>,
}

impl<E: Entity> MemoryEntityStore<E> {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a store pre-populated with `entities`
    pub fn with_entities(entities: impl IntoIterator<Item = E>) -> Self {
        let map = entities.into_iter().map(|e| (e.id(), e)).collect();
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Insert or replace an entity without going through the gateway
    pub async fn insert(&self, entity: E) {
        self.inner.write().await.insert(entity.id(), entity);
    }

    /// Get an entity regardless of whether it is active
    pub async fn get(&self, id: EntityId) -> Option<E> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Get the number of entities in the store, active or not
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl<E: Entity> Default for MemoryEntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> PersistenceGateway<E> for MemoryEntityStore<E> {
    async fn fetch_active_by_id(&self, id: EntityId) -> Result<Option<E>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(&id).filter(|e| e.is_active()).cloned())
    }

    async fn save(&self, entity: &E) -> Result<E, Error> {
        let mut guard = self.inner.write().await;
        guard.insert(entity.id(), entity.clone());
        Ok(entity.clone())
    }
}
