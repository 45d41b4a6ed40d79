// # Persistence Gateway Trait
//
// Defines the interface the coordinator uses to read and write entities.
//
// ## Purpose
//
// The gateway owns storage. The coordinator always re-fetches the entity at
// the start of a call and hands back a fully mutated copy to `save`, so an
// implementation only needs whole-entity reads and writes.
//
// ## Implementations
//
// - In-memory: `store::MemoryEntityStore`
// - File-based: `store::FileEntityStore` (JSON)

use async_trait::async_trait;

use crate::model::{Entity, EntityId};

/// Trait for entity persistence
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
/// Concurrent saves of the same entity are serialized by the implementation;
/// the last save wins.
///
/// ## Implementation Guidelines
///
/// - **No business logic**: never inspect or reject individual fields
/// - **No notifications**: emission is the coordinator's job, after `save`
///   returns
/// - **Hide inactive entities**: `fetch_active_by_id` must not return an
///   entity whose `is_active()` is false
#[async_trait]
pub trait PersistenceGateway<E: Entity>: Send + Sync {
    /// Fetch an active entity
    ///
    /// # Parameters
    ///
    /// - `id`: Entity identifier
    ///
    /// # Returns
    ///
    /// - `Ok(Some(E))`: The entity
    /// - `Ok(None)`: Absent or inactive
    /// - `Err(Error)`: Storage error
    async fn fetch_active_by_id(&self, id: EntityId) -> Result<Option<E>, crate::Error>;

    /// Persist an entity, inserting or replacing by id
    ///
    /// # Parameters
    ///
    /// - `entity`: Complete new state
    ///
    /// # Returns
    ///
    /// - `Ok(E)`: The entity as stored
    /// - `Err(Error)`: Storage error; the previous state must be kept
    async fn save(&self, entity: &E) -> Result<E, crate::Error>;
}
