// # File Entity Store
//
// File-based implementation of PersistenceGateway with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "entities": [
//     { "id": 1, "type": "CAT", "name": "Tama", ... }
//   ]
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::model::{Entity, EntityId};
use crate::traits::PersistenceGateway;
use crate::Error;

/// Entity file format version
const ENTITY_FILE_VERSION: &str = "1.0";

/// File-based entity store with crash recovery
///
/// Every `save` rewrites the whole file before returning, while holding the
/// write lock, so saves are serialized and durable. On a failed write the
/// in-memory state keeps the previous entity.
///
/// # Example
///
/// ```rust,no_run
/// use strays_core::model::{Animal, AnimalType, EntityId, SexType};
/// use strays_core::store::FileEntityStore;
/// use strays_core::traits::PersistenceGateway;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileEntityStore::<Animal>::new("/var/lib/strays/animals.json").await?;
///
///     store.save(&Animal::new(1, AnimalType::Cat, SexType::Female, "Tama")).await?;
///     assert!(store.fetch_active_by_id(EntityId(1)).await?.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileEntityStore<E> {
    path: PathBuf,
    entities: Arc<RwLock<HashMap<EntityId, E>>>,
}

/// Entity file format, as read
#[derive(Debug, Deserialize)]
#[serde(bound = "E: Entity")]
struct EntityFileFormat<E> {
    version: String,
    entities: Vec<E>,
}

/// Entity file format, as written
#[derive(Serialize)]
struct EntityFileRef<'a, E> {
    version: &'a str,
    entities: Vec<&'a E>,
}

impl<E: Entity> FileEntityStore<E> {
    /// Create or load a file entity store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing file
    /// 3. If it is corrupted, load the backup and restore the file from it
    /// 4. If both fail, start empty
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create data directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let entities = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            entities: Arc::new(RwLock::new(entities)),
        })
    }

    /// Load entities with automatic recovery from the backup file
    async fn load_with_recovery(path: &Path) -> Result<HashMap<EntityId, E>, Error> {
        match Self::load(path).await {
            Ok(entities) => {
                tracing::debug!("Loaded {} entities from {}", entities.len(), path.display());
                Ok(entities)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Entity file {} appears corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty store.");
                    return Ok(HashMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(entities) => {
                        tracing::info!("Recovered {} entities from backup", entities.len());
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore entity file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(entities)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with empty store.",
                            backup_err
                        );
                        Ok(HashMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Load entities from file; parse failures surface as `Error::Json`
    async fn load(path: &Path) -> Result<HashMap<EntityId, E>, Error> {
        if !path.exists() {
            tracing::debug!("Entity file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::persistence(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let file: EntityFileFormat<E> = serde_json::from_str(&content)?;

        if file.version != ENTITY_FILE_VERSION {
            tracing::warn!(
                "Entity file version mismatch: expected {}, got {}. Attempting to load anyway.",
                ENTITY_FILE_VERSION,
                file.version
            );
        }

        Ok(file.entities.into_iter().map(|e| (e.id(), e)).collect())
    }

    /// Write `entities` to file atomically
    async fn write(&self, entities: &HashMap<EntityId, E>) -> Result<(), Error> {
        let mut sorted: Vec<&E> = entities.values().collect();
        sorted.sort_by_key(|e| e.id());

        let file = EntityFileRef {
            version: ENTITY_FILE_VERSION,
            entities: sorted,
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::persistence(format!("Failed to serialize entities: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.flush().await.map_err(|e| {
                Error::persistence(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Entities written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<E: Entity> PersistenceGateway<E> for FileEntityStore<E> {
    async fn fetch_active_by_id(&self, id: EntityId) -> Result<Option<E>, Error> {
        let guard = self.entities.read().await;
        Ok(guard.get(&id).filter(|e| e.is_active()).cloned())
    }

    async fn save(&self, entity: &E) -> Result<E, Error> {
        let mut guard = self.entities.write().await;

        let mut next = guard.clone();
        next.insert(entity.id(), entity.clone());
        self.write(&next).await?;
        *guard = next;

        Ok(entity.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Animal, AnimalType, SexType};
    use tempfile::tempdir;

    fn cat(name: &str) -> Animal {
        Animal::new(1, AnimalType::Cat, SexType::Female, name)
    }

    #[tokio::test]
    async fn test_file_store_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("animals.json");

        let store = FileEntityStore::<Animal>::new(&path).await.unwrap();
        assert!(store.fetch_active_by_id(EntityId(1)).await.unwrap().is_none());

        store.save(&cat("Tama")).await.unwrap();
        assert!(path.exists());

        // Load new instance and verify persistence
        let store2 = FileEntityStore::<Animal>::new(&path).await.unwrap();
        let loaded = store2.fetch_active_by_id(EntityId(1)).await.unwrap();
        assert_eq!(loaded.map(|a| a.name), Some("Tama".to_string()));
    }

    #[tokio::test]
    async fn test_file_store_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("animals.json");

        let store = FileEntityStore::<Animal>::new(&path).await.unwrap();
        store.save(&cat("Tama")).await.unwrap();
        // Second write leaves the first state in the backup
        store.save(&cat("Mike")).await.unwrap();

        let backup_path = FileEntityStore::<Animal>::backup_path(&path);
        assert!(backup_path.exists(), "Backup file should exist after write");

        fs::write(&path, b"corrupted json data").await.unwrap();

        let store2 = FileEntityStore::<Animal>::new(&path).await.unwrap();
        let recovered = store2.fetch_active_by_id(EntityId(1)).await.unwrap().unwrap();
        assert_eq!(recovered.name, "Tama", "Backup should contain previous state");

        // Main file was restored from the backup
        let content = fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("Tama"));
    }

    #[tokio::test]
    async fn test_inactive_entities_persisted_but_hidden() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("animals.json");

        let store = FileEntityStore::<Animal>::new(&path).await.unwrap();
        let mut gone = cat("Tama");
        gone.deactivate();
        store.save(&gone).await.unwrap();

        let store2 = FileEntityStore::<Animal>::new(&path).await.unwrap();
        assert!(store2.fetch_active_by_id(EntityId(1)).await.unwrap().is_none());
        assert!(store2.entities.read().await.contains_key(&EntityId(1)));
    }

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("animals.json");

        let store = FileEntityStore::<Animal>::new(&path).await.unwrap();
        store.save(&cat("Tama")).await.unwrap();

        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }
}
