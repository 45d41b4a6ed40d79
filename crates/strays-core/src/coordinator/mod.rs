//! Update coordinator
//!
//! The UpdateCoordinator is responsible for:
//! - Fetching the authoritative entity through the persistence gateway
//! - Running the request through the applier
//! - Persisting the working copy when something applied
//! - Recording notifications strictly after the save succeeded
//!
//! ## State Machine
//!
//! ```text
//! Received ──► Fetched ──► Evaluated ──┬─► AppliedNone ──► Rejected (InvalidUpdate)
//!                 │                    │
//!                 ▼                    └─► AppliedSome ──► Persisted ──► Notified ──► Returned
//!          Rejected (NotFound)                  │
//!                                               ▼
//!                                     Rejected (Internal)
//! ```
//!
//! Steps always run in sequence. The coordinator holds no mutable state of
//! its own; concurrent calls on one entity are serialized by the gateway.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::applier::{FieldChange, UpdateApplier};
use crate::config::{CoordinatorConfig, DeliveryGuarantee};
use crate::error::{Error, Result};
use crate::model::{Entity, EntityId, EntityRef, RequesterId};
use crate::notifier::{ChangeNotifier, NotificationContentType, NotificationRecord};
use crate::registry::RuleRegistry;
use crate::rules::RuleSet;
use crate::traits::{IdentityProvider, NotificationGateway, PersistenceGateway};
use crate::value::UpdateRequest;

/// Pipeline stage at which a call stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStage {
    Authenticate,
    Fetch,
    Evaluate,
    Persist,
    Notify,
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authenticate => "authenticate",
            Self::Fetch => "fetch",
            Self::Evaluate => "evaluate",
            Self::Persist => "persist",
            Self::Notify => "notify",
        };
        f.write_str(name)
    }
}

/// Events emitted by the UpdateCoordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// Update persisted (notifications may still have failed)
    UpdateApplied {
        entity: EntityRef,
        requester: RequesterId,
        fields: Vec<String>,
        skipped: usize,
    },

    /// Call ended without a lasting change
    UpdateRejected {
        entity: EntityRef,
        requester: Option<RequesterId>,
        stage: UpdateStage,
        reason: String,
    },

    /// A notification could not be recorded
    NotificationFailed {
        entity: EntityRef,
        content_type: NotificationContentType,
        error: String,
        /// The pre-update state was restored
        compensated: bool,
    },

    /// Entity marked inactive
    EntityDeactivated {
        entity: EntityRef,
        requester: RequesterId,
    },
}

/// What a rollback needs to know about the call being undone
struct Rollback<'a, E> {
    rules: &'a RuleSet<E>,
    /// Entity as fetched, before the update
    previous: &'a E,
    /// Entity as returned by the save
    saved: &'a E,
    applied: &'a [FieldChange],
}

/// Coordinates one entity type's partial updates
///
/// ## Threading
///
/// `Send + Sync`; share it behind an `Arc` and call it from any number of
/// tasks.
///
/// ## Errors
///
/// Callers see `Unauthenticated`, `NotFound`, `InvalidUpdate`, `Forbidden`
/// or `Internal`. Gateway failures are logged with their detail and surface
/// as `Internal`.
pub struct UpdateCoordinator<E: Entity> {
    /// Field rules, shared and read-only
    registry: Arc<RuleRegistry>,

    /// Entity storage
    store: Box<dyn PersistenceGateway<E>>,

    /// Notification sink
    notifications: Box<dyn NotificationGateway>,

    applier: UpdateApplier,
    notifier: ChangeNotifier,

    /// What a failed notification does to the call
    delivery: DeliveryGuarantee,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<CoordinatorEvent>,
}

impl<E: Entity> UpdateCoordinator<E> {
    /// Create a new coordinator
    ///
    /// # Parameters
    ///
    /// - `registry`: Rule registry; must hold a rule set for `E`
    /// - `store`: Persistence gateway for `E`
    /// - `notifications`: Notification gateway
    /// - `config`: Coordinator configuration
    ///
    /// # Returns
    ///
    /// A tuple of (coordinator, event_receiver) where event_receiver yields
    /// coordinator events
    pub fn new(
        registry: Arc<RuleRegistry>,
        store: Box<dyn PersistenceGateway<E>>,
        notifications: Box<dyn NotificationGateway>,
        config: CoordinatorConfig,
    ) -> Result<(Self, mpsc::Receiver<CoordinatorEvent>)> {
        config.validate()?;
        registry.rule_set::<E>()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let coordinator = Self {
            registry,
            store,
            notifications,
            applier: UpdateApplier::new(),
            notifier: ChangeNotifier::new(),
            delivery: config.delivery,
            event_tx: tx,
        };

        Ok((coordinator, rx))
    }

    /// Apply a partial update on behalf of `requester`
    ///
    /// # Parameters
    ///
    /// - `id`: Entity to update
    /// - `requester`: Authenticated requester
    /// - `request`: Raw field/value pairs
    ///
    /// # Returns
    ///
    /// - `Ok(E)`: The entity as persisted
    /// - `Err(Error::NotFound)`: No active entity with this id
    /// - `Err(Error::InvalidUpdate)`: No field passed all gates; nothing was
    ///   stored or notified
    /// - `Err(Error::Internal)`: Saving failed (nothing stored or notified),
    ///   or a notification failed under [`DeliveryGuarantee::Required`]
    ///   (nothing notified, this call's changes rolled back)
    pub async fn apply_update(
        &self,
        id: EntityId,
        requester: RequesterId,
        request: &UpdateRequest,
    ) -> Result<E> {
        let target = EntityRef::new(E::KIND, id);
        debug!("Received update for {} from {} ({} fields)", target, requester, request.len());

        let rules = self.rules()?;

        let current = self.fetch(target, requester).await?;
        debug!("Fetched {}", target);

        let outcome = self.applier.apply(&current, rules, requester, request);
        let Some(mut updated) = outcome.updated else {
            debug!("Nothing applied to {} ({} fields skipped)", target, outcome.skipped);
            self.reject(
                target,
                Some(requester),
                UpdateStage::Evaluate,
                format!("{} fields skipped", outcome.skipped),
            );
            return Err(Error::InvalidUpdate);
        };

        updated.touch(Utc::now());
        let saved = match self.store.save(&updated).await {
            Ok(saved) => saved,
            Err(e) => {
                error!("Failed to save {}: {}", target, e);
                self.reject(target, Some(requester), UpdateStage::Persist, e.to_string());
                return Err(Error::internal(format!("failed to save {}", target)));
            }
        };
        debug!("Persisted {}", target);

        let records = self
            .notifier
            .notify(rules, saved.entity_ref(), &outcome.applied, requester);
        let rollback = Rollback {
            rules,
            previous: &current,
            saved: &saved,
            applied: &outcome.applied,
        };
        self.deliver(&records, &rollback, requester).await?;

        let fields: Vec<String> = outcome.applied.iter().map(|c| c.field.clone()).collect();
        info!(
            "Updated {} by {}: [{}] ({} skipped, {} notifications)",
            target,
            requester,
            fields.join(", "),
            outcome.skipped,
            records.len()
        );
        self.emit_event(CoordinatorEvent::UpdateApplied {
            entity: target,
            requester,
            fields,
            skipped: outcome.skipped,
        });

        Ok(saved)
    }

    /// Resolve the requester through `identity`, then [`Self::apply_update`]
    ///
    /// # Returns
    ///
    /// `Err(Error::Unauthenticated)` when no requester can be resolved.
    pub async fn apply_update_as(
        &self,
        identity: &dyn IdentityProvider,
        id: EntityId,
        request: &UpdateRequest,
    ) -> Result<E> {
        let requester = self.authenticate(identity, id).await?;
        self.apply_update(id, requester, request).await
    }

    /// Mark an entity inactive
    ///
    /// Only the owner may deactivate; ownerless entities cannot be
    /// deactivated through the coordinator. No notification is recorded.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Entity saved as inactive
    /// - `Err(Error::NotFound)`: No active entity with this id
    /// - `Err(Error::Forbidden)`: Requester is not the owner
    /// - `Err(Error::Internal)`: Gateway failure
    pub async fn deactivate(&self, id: EntityId, requester: RequesterId) -> Result<()> {
        let target = EntityRef::new(E::KIND, id);

        let current = self.fetch(target, requester).await?;

        if current.owner_id() != Some(requester) {
            self.reject(target, Some(requester), UpdateStage::Evaluate, "not the owner");
            return Err(Error::forbidden(format!(
                "{} may not deactivate {}",
                requester, target
            )));
        }

        let mut inactive = current;
        inactive.deactivate();
        inactive.touch(Utc::now());

        if let Err(e) = self.store.save(&inactive).await {
            error!("Failed to save deactivated {}: {}", target, e);
            self.reject(target, Some(requester), UpdateStage::Persist, e.to_string());
            return Err(Error::internal(format!("failed to save {}", target)));
        }

        info!("Deactivated {} by {}", target, requester);
        self.emit_event(CoordinatorEvent::EntityDeactivated {
            entity: target,
            requester,
        });
        Ok(())
    }

    /// Resolve the requester through `identity`, then [`Self::deactivate`]
    pub async fn deactivate_as(&self, identity: &dyn IdentityProvider, id: EntityId) -> Result<()> {
        let requester = self.authenticate(identity, id).await?;
        self.deactivate(id, requester).await
    }

    /// Fetch the active entity; the call is rejected at the fetch stage if
    /// there is none
    async fn fetch(&self, target: EntityRef, requester: RequesterId) -> Result<E> {
        match self.store.fetch_active_by_id(target.id).await {
            Ok(Some(entity)) => Ok(entity),
            Ok(None) => {
                self.reject(target, Some(requester), UpdateStage::Fetch, "not found");
                Err(Error::not_found(target.to_string()))
            }
            Err(e) => {
                error!("Failed to fetch {}: {}", target, e);
                self.reject(target, Some(requester), UpdateStage::Fetch, e.to_string());
                Err(Error::internal(format!("failed to fetch {}", target)))
            }
        }
    }

    fn rules(&self) -> Result<&RuleSet<E>> {
        self.registry.rule_set::<E>().map_err(|e| {
            error!("No rules for {}: {}", E::KIND, e);
            Error::internal(e.to_string())
        })
    }

    async fn authenticate(&self, identity: &dyn IdentityProvider, id: EntityId) -> Result<RequesterId> {
        match identity.current_requester().await {
            Ok(requester) => Ok(requester),
            Err(e) => {
                let target = EntityRef::new(E::KIND, id);
                debug!("Unauthenticated call for {}: {}", target, e);
                self.reject(target, None, UpdateStage::Authenticate, e.to_string());
                match e {
                    Error::Unauthenticated => Err(e),
                    other => Err(Error::internal(format!(
                        "failed to resolve requester: {}",
                        other
                    ))),
                }
            }
        }
    }

    /// Record notifications, applying the delivery guarantee
    ///
    /// Best effort records each notification on its own and carries on past
    /// failures. Required records the whole batch at once; if that fails,
    /// nothing was recorded and the call's own changes are rolled back.
    async fn deliver(
        &self,
        records: &[NotificationRecord],
        rollback: &Rollback<'_, E>,
        requester: RequesterId,
    ) -> Result<()> {
        match self.delivery {
            DeliveryGuarantee::BestEffort => {
                for record in records {
                    let result = match record {
                        NotificationRecord::Update(n) => self.notifications.record_update(n).await,
                        NotificationRecord::Alert(n) => self.notifications.record_alert(n).await,
                    };
                    if let Err(e) = result {
                        warn!(
                            "Failed to record {} notification for {}: {}",
                            record.content_type(),
                            record.entity(),
                            e
                        );
                        self.emit_event(CoordinatorEvent::NotificationFailed {
                            entity: record.entity(),
                            content_type: record.content_type(),
                            error: e.to_string(),
                            compensated: false,
                        });
                    }
                }
                Ok(())
            }
            DeliveryGuarantee::Required => {
                let Err(e) = self.notifications.record_all(records).await else {
                    return Ok(());
                };
                let entity = rollback.saved.entity_ref();
                error!(
                    "Failed to record {} notifications for {}: {}. Rolling back.",
                    records.len(),
                    entity,
                    e
                );

                let compensated = self.restore(rollback).await;
                for record in records {
                    self.emit_event(CoordinatorEvent::NotificationFailed {
                        entity,
                        content_type: record.content_type(),
                        error: e.to_string(),
                        compensated,
                    });
                }
                self.reject(entity, Some(requester), UpdateStage::Notify, e.to_string());
                Err(Error::internal(format!(
                    "failed to record notifications for {}",
                    entity
                )))
            }
        }
    }

    /// Undo this call's changes without discarding anyone else's
    ///
    /// The entity is re-fetched first. If it is still exactly what this call
    /// saved, the pre-update snapshot goes back as is. Otherwise only fields
    /// that still hold this call's new value are reverted to their old value.
    ///
    /// Returns whether every change of this call is gone.
    async fn restore(&self, rollback: &Rollback<'_, E>) -> bool {
        let entity = rollback.saved.entity_ref();

        let latest = match self.store.fetch_active_by_id(entity.id).await {
            Ok(Some(latest)) => latest,
            Ok(None) => {
                warn!("{} disappeared before it could be restored", entity);
                return false;
            }
            Err(e) => {
                error!("Failed to re-fetch {} for restore: {}", entity, e);
                return false;
            }
        };

        let mut complete = true;
        let restored = if latest == *rollback.saved {
            rollback.previous.clone()
        } else {
            let mut merged = latest;
            let mut reverted = 0;
            for change in rollback.applied {
                let Some(rule) = rollback.rules.get(&change.field) else {
                    complete = false;
                    continue;
                };
                if rule.read(&merged) != change.new {
                    debug!("{}.{} changed by another writer; keeping it", entity, change.field);
                    continue;
                }
                if rule.write(&mut merged, &change.old) {
                    reverted += 1;
                } else {
                    warn!("Could not revert {}.{} to {}", entity, change.field, change.old);
                    complete = false;
                }
            }
            if reverted == 0 {
                return complete;
            }
            merged
        };

        match self.store.save(&restored).await {
            Ok(_) => complete,
            Err(e) => {
                error!("Failed to restore {}: {}", entity, e);
                false
            }
        }
    }

    fn reject(
        &self,
        entity: EntityRef,
        requester: Option<RequesterId>,
        stage: UpdateStage,
        reason: impl Into<String>,
    ) {
        self.emit_event(CoordinatorEvent::UpdateRejected {
            entity,
            requester,
            stage,
            reason: reason.into(),
        });
    }

    /// Emit a coordinator event
    ///
    /// # Parameters
    ///
    /// - `event`: The event to emit
    fn emit_event(&self, event: CoordinatorEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Animal, AnimalType, EntityKind, SexType, UserProfile};
    use crate::store::{MemoryEntityStore, MemoryNotificationLog};
    use crate::traits::FixedIdentity;

    fn coordinator(
        store: MemoryEntityStore<Animal>,
        log: MemoryNotificationLog,
    ) -> (UpdateCoordinator<Animal>, mpsc::Receiver<CoordinatorEvent>) {
        UpdateCoordinator::new(
            Arc::new(RuleRegistry::standard().unwrap()),
            Box::new(store),
            Box::new(log),
            CoordinatorConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_unregistered_entity_type_rejected_at_construction() {
        let result = UpdateCoordinator::<UserProfile>::new(
            Arc::new(RuleRegistry::new()),
            Box::new(MemoryEntityStore::<UserProfile>::new()),
            Box::new(MemoryNotificationLog::new()),
            CoordinatorConfig::default(),
        );
        assert!(matches!(result, Err(Error::UnknownEntityType(_))));
    }

    #[tokio::test]
    async fn test_update_stamps_last_updated_and_emits_event() {
        let cat = Animal::new(1, AnimalType::Cat, SexType::Female, "Tama");
        let before = cat.last_updated;
        let store = MemoryEntityStore::with_entities([cat]);
        let (coordinator, mut events) = coordinator(store.clone(), MemoryNotificationLog::new());

        let request = UpdateRequest::new().with("name", "Mike");
        let saved = coordinator
            .apply_update(EntityId(1), RequesterId(9), &request)
            .await
            .unwrap();

        assert!(saved.last_updated >= before);
        assert_eq!(store.get(EntityId(1)).await.unwrap(), saved);
        assert_eq!(
            events.try_recv().unwrap(),
            CoordinatorEvent::UpdateApplied {
                entity: EntityRef::new(EntityKind::Animal, EntityId(1)),
                requester: RequesterId(9),
                fields: vec!["name".to_string()],
                skipped: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_anonymous_caller_rejected() {
        let store = MemoryEntityStore::with_entities([Animal::new(
            1,
            AnimalType::Cat,
            SexType::Female,
            "Tama",
        )]);
        let log = MemoryNotificationLog::new();
        let (coordinator, mut events) = coordinator(store, log.clone());

        let result = coordinator
            .apply_update_as(
                &FixedIdentity::anonymous(),
                EntityId(1),
                &UpdateRequest::new().with("name", "Mike"),
            )
            .await;

        assert!(matches!(result, Err(Error::Unauthenticated)));
        assert!(log.is_empty().await);
        assert!(matches!(
            events.try_recv().unwrap(),
            CoordinatorEvent::UpdateRejected {
                stage: UpdateStage::Authenticate,
                requester: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_full_event_channel_does_not_fail_updates() {
        let store = MemoryEntityStore::with_entities([Animal::new(
            1,
            AnimalType::Cat,
            SexType::Female,
            "Tama",
        )]);
        let (coordinator, _events) = UpdateCoordinator::new(
            Arc::new(RuleRegistry::standard().unwrap()),
            Box::new(store),
            Box::new(MemoryNotificationLog::new()),
            CoordinatorConfig {
                event_channel_capacity: 1,
                ..CoordinatorConfig::default()
            },
        )
        .unwrap();

        for name in ["A", "B", "C"] {
            let request = UpdateRequest::new().with("name", name);
            coordinator
                .apply_update(EntityId(1), RequesterId(1), &request)
                .await
                .unwrap();
        }
    }
}
