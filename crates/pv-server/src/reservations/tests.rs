//! Reservation manager tests against an in-memory store.

use std::time::Duration;

use pv_core::config::ElementsConfig;

use super::*;
use crate::auth::{Identity, Role};
use crate::storage::{ELEMENTS_TABLE, ElementRow, Store};

fn caller() -> Identity {
    Identity {
        uid: 1,
        name: "alice".into(),
        role: Role::User,
        generation: 0,
    }
}

async fn manager_with(ttl: Duration) -> (ReservationManager, Store) {
    let store = Store::open_in_memory().await.unwrap();
    let config = ElementsConfig::default();
    let catalog = ElementCatalog::from_config(&config).unwrap();
    let manager = ReservationManager::new(store.clone(), catalog, InventoryCache::new(ttl));
    (manager, store)
}

async fn test_manager() -> ReservationManager {
    manager_with(Duration::from_secs(300)).await.0
}

async fn insert_behind_manager(store: &Store, mid: &str) {
    let row = ElementRow {
        mid: mid.to_string(),
        name: None,
    };
    store.insert(ELEMENTS_TABLE, &row).await.unwrap();
}

#[tokio::test]
async fn reserve_then_list() {
    let manager = test_manager().await;
    let user = caller();
    assert!(manager.list_reservations().await.unwrap().is_empty());

    let snapshot = manager.reserve("pv-a3", Some("Bob"), &user).await.unwrap();
    assert_eq!(snapshot.get("pv-a3"), Some(&Some("Bob".to_string())));

    let listed = manager.list_reservations().await.unwrap();
    assert_eq!(listed, snapshot);
}

#[tokio::test]
async fn anonymous_reservation_has_no_holder() {
    let manager = test_manager().await;
    let user = caller();
    let snapshot = manager.reserve("wr-2", None, &user).await.unwrap();
    assert_eq!(snapshot.get("wr-2"), Some(&None));

    let snapshot = manager.reserve("wr-3", Some("  "), &user).await.unwrap();
    assert_eq!(snapshot.get("wr-3"), Some(&None));
}

#[tokio::test]
async fn duplicate_reserve_conflicts_and_keeps_holder() {
    let manager = test_manager().await;
    let user = caller();
    manager.reserve("pv-a3", Some("Bob"), &user).await.unwrap();

    let result = manager.reserve("pv-a3", Some("Eve"), &user).await;
    assert!(matches!(result, Err(ReservationError::Conflict { ref mid }) if mid == "pv-a3"));

    let listed = manager.list_reservations().await.unwrap();
    assert_eq!(listed.get("pv-a3"), Some(&Some("Bob".to_string())));
}

#[tokio::test]
async fn store_uniqueness_is_conflict_when_cache_is_stale() {
    let (manager, store) = manager_with(Duration::from_secs(300)).await;
    // Prime an empty snapshot, then write behind the manager's back.
    assert!(manager.list_reservations().await.unwrap().is_empty());
    insert_behind_manager(&store, "bs-1").await;

    let result = manager.reserve("bs-1", Some("Eve"), &caller()).await;
    assert!(matches!(result, Err(ReservationError::Conflict { .. })));
}

#[tokio::test]
async fn invalid_id_is_rejected_before_store_access() {
    let (manager, store) = manager_with(Duration::from_secs(300)).await;
    let user = caller();
    store.pool().close().await;

    for mid in ["pv-a17", "pv-a0", "pv-a03", "nope"] {
        let result = manager.reserve(mid, None, &user).await;
        assert!(matches!(result, Err(ReservationError::InvalidElementId(_))), "{mid}");
    }
    assert!(matches!(
        manager.release("pv-w1", &user).await,
        Err(ReservationError::InvalidElementId(_))
    ));
    assert!(matches!(
        manager.modify("wr-9", None, &user).await,
        Err(ReservationError::InvalidElementId(_))
    ));
}

#[tokio::test]
async fn modify_changes_holder() {
    let manager = test_manager().await;
    let user = caller();
    manager.reserve("pv-c3", Some("Ann"), &user).await.unwrap();

    let snapshot = manager.modify("pv-c3", Some("Kim"), &user).await.unwrap();
    assert_eq!(snapshot.get("pv-c3"), Some(&Some("Kim".to_string())));

    let snapshot = manager.modify("pv-c3", None, &user).await.unwrap();
    assert_eq!(snapshot.get("pv-c3"), Some(&None));
}

#[tokio::test]
async fn modify_unreserved_is_not_found() {
    let manager = test_manager().await;
    let result = manager.modify("pv-d4", Some("Kim"), &caller()).await;
    assert!(matches!(result, Err(ReservationError::NotFound { .. })));
    assert!(manager.list_reservations().await.unwrap().is_empty());
}

#[tokio::test]
async fn release_is_idempotent() {
    let manager = test_manager().await;
    let user = caller();
    manager.reserve("pv-e1", Some("Bob"), &user).await.unwrap();

    let snapshot = manager.release("pv-e1", &user).await.unwrap();
    assert!(!snapshot.contains_key("pv-e1"));

    let snapshot = manager.release("pv-e1", &user).await.unwrap();
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn cached_snapshot_hides_writes_until_expiry() {
    let (manager, store) = manager_with(Duration::from_millis(100)).await;
    assert!(manager.list_reservations().await.unwrap().is_empty());

    insert_behind_manager(&store, "pv-h1").await;
    assert!(manager.list_reservations().await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(250)).await;
    let snapshot = manager.list_reservations().await.unwrap();
    assert!(snapshot.contains_key("pv-h1"));
}

#[tokio::test]
async fn store_failure_surfaces_as_store_error() {
    let (manager, store) = manager_with(Duration::from_secs(300)).await;
    store.pool().close().await;

    assert!(matches!(
        manager.list_reservations().await,
        Err(ReservationError::Store(_))
    ));
}
