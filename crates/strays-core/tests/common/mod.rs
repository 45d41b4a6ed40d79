//! Test doubles and common utilities for update contract tests
//!
//! The doubles count every gateway call and can be told to fail, so the
//! contracts can check not only results but what the coordinator did (or
//! did not do) to its collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use strays_core::config::{CoordinatorConfig, DeliveryGuarantee};
use strays_core::error::{Error, Result};
use strays_core::model::{Animal, AnimalType, Entity, EntityId, GeoPoint, RequesterId, SexType};
use strays_core::notifier::{AlertNotification, NotificationRecord, UpdateNotification};
use strays_core::traits::{NotificationGateway, PersistenceGateway};
use strays_core::{CoordinatorEvent, RuleRegistry, UpdateCoordinator};
use tokio::sync::mpsc;

/// The owner (primary caretaker) of the fixture animals
pub const OWNER: RequesterId = RequesterId(1);

/// Any other authenticated user
pub const STRANGER: RequesterId = RequesterId(2);

/// A mock PersistenceGateway that tracks calls
pub struct MockEntityStore<E> {
    entities: Arc<Mutex<HashMap<EntityId, E>>>,
    fetch_call_count: Arc<AtomicUsize>,
    save_call_count: Arc<AtomicUsize>,
    fail_saves: Arc<AtomicBool>,
}

impl<E: Entity> MockEntityStore<E> {
    pub fn with_entities(entities: impl IntoIterator<Item = E>) -> Self {
        Self {
            entities: Arc::new(Mutex::new(
                entities.into_iter().map(|e| (e.id(), e)).collect(),
            )),
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
            save_call_count: Arc::new(AtomicUsize::new(0)),
            fail_saves: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a new MockEntityStore that shares state and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            entities: Arc::clone(&other.entities),
            fetch_call_count: Arc::clone(&other.fetch_call_count),
            save_call_count: Arc::clone(&other.save_call_count),
            fail_saves: Arc::clone(&other.fail_saves),
        }
    }

    /// Make every subsequent save fail
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    /// Number of save attempts, failed ones included
    pub fn save_call_count(&self) -> usize {
        self.save_call_count.load(Ordering::SeqCst)
    }

    /// Stored state, active or not
    pub fn stored(&self, id: EntityId) -> Option<E> {
        self.entities.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait::async_trait]
impl<E: Entity> PersistenceGateway<E> for MockEntityStore<E> {
    async fn fetch_active_by_id(&self, id: EntityId) -> Result<Option<E>> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .entities
            .lock()
            .unwrap()
            .get(&id)
            .filter(|e| e.is_active())
            .cloned())
    }

    async fn save(&self, entity: &E) -> Result<E> {
        self.save_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::persistence("disk on fire"));
        }
        self.entities
            .lock()
            .unwrap()
            .insert(entity.id(), entity.clone());
        Ok(entity.clone())
    }
}

/// A mock NotificationGateway that records what it was given
pub struct MockNotificationGateway {
    records: Arc<Mutex<Vec<NotificationRecord>>>,
    attempt_count: Arc<AtomicUsize>,
    fail_updates: Arc<AtomicBool>,
    fail_alerts: Arc<AtomicBool>,
}

impl MockNotificationGateway {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            attempt_count: Arc::new(AtomicUsize::new(0)),
            fail_updates: Arc::new(AtomicBool::new(false)),
            fail_alerts: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a new MockNotificationGateway that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            attempt_count: Arc::clone(&other.attempt_count),
            fail_updates: Arc::clone(&other.fail_updates),
            fail_alerts: Arc::clone(&other.fail_alerts),
        }
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_alerts(&self, fail: bool) {
        self.fail_alerts.store(fail, Ordering::SeqCst);
    }

    /// Successfully recorded notifications, in order
    pub fn records(&self) -> Vec<NotificationRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Number of delivery attempts (a batch counts once), failed ones included
    pub fn attempt_count(&self) -> usize {
        self.attempt_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl NotificationGateway for MockNotificationGateway {
    async fn record_update(&self, notification: &UpdateNotification) -> Result<()> {
        self.attempt_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::notification("update feed unavailable"));
        }
        self.records
            .lock()
            .unwrap()
            .push(NotificationRecord::Update(notification.clone()));
        Ok(())
    }

    async fn record_alert(&self, notification: &AlertNotification) -> Result<()> {
        self.attempt_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_alerts.load(Ordering::SeqCst) {
            return Err(Error::notification("alert feed unavailable"));
        }
        self.records
            .lock()
            .unwrap()
            .push(NotificationRecord::Alert(notification.clone()));
        Ok(())
    }

    /// One attempt per batch; a batch holding a failing kind records nothing
    async fn record_all(&self, records: &[NotificationRecord]) -> Result<()> {
        self.attempt_count.fetch_add(1, Ordering::SeqCst);
        for record in records {
            match record {
                NotificationRecord::Update(_) if self.fail_updates.load(Ordering::SeqCst) => {
                    return Err(Error::notification("update feed unavailable"));
                }
                NotificationRecord::Alert(_) if self.fail_alerts.load(Ordering::SeqCst) => {
                    return Err(Error::notification("alert feed unavailable"));
                }
                _ => {}
            }
        }
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}

/// Cat with id 1, cared for by [`OWNER`], with a known location
pub fn owned_cat() -> Animal {
    Animal::new(1, AnimalType::Cat, SexType::Female, "SabiSabi")
        .with_caretaker(OWNER)
        .with_location(GeoPoint::new(34.70, 135.30))
}

/// Dog with id 2, no caretaker, sex unknown
pub fn ownerless_dog() -> Animal {
    Animal::new(2, AnimalType::Dog, SexType::Unknown, "Pochi")
}

/// Build a coordinator over the given doubles
pub fn coordinator<E: Entity>(
    store: &MockEntityStore<E>,
    notifications: &MockNotificationGateway,
    delivery: DeliveryGuarantee,
) -> (UpdateCoordinator<E>, mpsc::Receiver<CoordinatorEvent>) {
    UpdateCoordinator::new(
        Arc::new(RuleRegistry::standard().expect("standard rules are valid")),
        Box::new(MockEntityStore::sharing_counters_with(store)),
        Box::new(MockNotificationGateway::sharing_counters_with(notifications)),
        CoordinatorConfig::default().with_delivery(delivery),
    )
    .expect("coordinator construction succeeds")
}

/// Drain every event emitted so far
pub fn drain(events: &mut mpsc::Receiver<CoordinatorEvent>) -> Vec<CoordinatorEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
