//! Contract Test: Deactivation
//!
//! Constraints verified:
//! - Only the owner may deactivate an entity
//! - A deactivated entity is invisible: later updates are NotFound
//! - Deactivation records no notification
//!
//! If this test fails, strangers can hide animals (or nobody can).

mod common;

use common::*;
use serde_json::json;
use strays_core::config::DeliveryGuarantee;
use strays_core::model::{EntityId, EntityKind, EntityRef, RequesterId, UserProfile};
use strays_core::traits::FixedIdentity;
use strays_core::{CoordinatorEvent, Error, UpdateRequest};

#[tokio::test]
async fn non_owner_is_forbidden() {
    let store = MockEntityStore::with_entities([owned_cat()]);
    let notifications = MockNotificationGateway::new();
    let (coordinator, _events) = coordinator(&store, &notifications, DeliveryGuarantee::BestEffort);

    let result = coordinator.deactivate(EntityId(1), STRANGER).await;

    assert!(matches!(result, Err(Error::Forbidden(_))));
    assert!(store.stored(EntityId(1)).unwrap().should_appear);
    assert_eq!(store.save_call_count(), 0);
}

#[tokio::test]
async fn ownerless_entity_cannot_be_deactivated() {
    let store = MockEntityStore::with_entities([ownerless_dog()]);
    let notifications = MockNotificationGateway::new();
    let (coordinator, _events) = coordinator(&store, &notifications, DeliveryGuarantee::BestEffort);

    let result = coordinator.deactivate(EntityId(2), OWNER).await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
}

#[tokio::test]
async fn owner_deactivation_hides_entity() {
    let store = MockEntityStore::with_entities([owned_cat()]);
    let notifications = MockNotificationGateway::new();
    let (coordinator, mut events) = coordinator(&store, &notifications, DeliveryGuarantee::BestEffort);

    coordinator
        .deactivate(EntityId(1), OWNER)
        .await
        .expect("owner may deactivate");

    let stored = store.stored(EntityId(1)).expect("soft delete keeps the record");
    assert!(!stored.should_appear);
    assert!(notifications.records().is_empty());
    assert_eq!(
        drain(&mut events),
        vec![CoordinatorEvent::EntityDeactivated {
            entity: EntityRef::new(EntityKind::Animal, EntityId(1)),
            requester: OWNER,
        }]
    );

    let later = coordinator
        .apply_update(
            EntityId(1),
            OWNER,
            &UpdateRequest::try_from(json!({"name": "Rex"})).unwrap(),
        )
        .await;
    assert!(matches!(later, Err(Error::NotFound(_))));

    let again = coordinator.deactivate(EntityId(1), OWNER).await;
    assert!(matches!(again, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn user_deletes_own_profile() {
    let store = MockEntityStore::with_entities([UserProfile::new(7, "Sakura")]);
    let notifications = MockNotificationGateway::new();
    let (coordinator, _events) = coordinator(&store, &notifications, DeliveryGuarantee::BestEffort);

    let result = coordinator
        .deactivate_as(&FixedIdentity::new(RequesterId(8)), EntityId(7))
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));

    coordinator
        .deactivate_as(&FixedIdentity::new(RequesterId(7)), EntityId(7))
        .await
        .expect("user may delete own profile");

    let stored = store.stored(EntityId(7)).unwrap();
    assert!(stored.is_deleted);
    assert!(stored.deletion_requested_at.is_some());
}

#[tokio::test]
async fn anonymous_deactivation_is_unauthenticated() {
    let store = MockEntityStore::with_entities([owned_cat()]);
    let notifications = MockNotificationGateway::new();
    let (coordinator, _events) = coordinator(&store, &notifications, DeliveryGuarantee::BestEffort);

    let result = coordinator
        .deactivate_as(&FixedIdentity::anonymous(), EntityId(1))
        .await;

    assert!(matches!(result, Err(Error::Unauthenticated)));
    assert_eq!(store.fetch_call_count(), 0);
}
