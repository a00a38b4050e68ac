//! Integration tests for `AggregateManager`: identity map semantics on top of
//! the repository.

mod common;

use common::{Basket, BasketId, basket_repository};
use rehydrate::{
    Aggregate, AggregateManager, Identifier, RepositoryError,
    store::{EventStore, inmemory},
};

fn manager(store: &inmemory::Store) -> AggregateManager<inmemory::Store, Basket> {
    AggregateManager::new(basket_repository(store.clone()))
}

async fn stored_len(store: &inmemory::Store, id: &BasketId) -> usize {
    store
        .read(Basket::KIND, id.as_str())
        .await
        .unwrap()
        .map_or(0, |stream| stream.len())
}

#[tokio::test]
async fn add_clear_get_round_trip() {
    let store = inmemory::Store::new();
    let mut manager = manager(&store);
    let id = BasketId::new("b-1");

    manager.add(Basket::pick_up(id.clone())).await.unwrap();
    assert_eq!(stored_len(&store, &id).await, 1);

    manager.clear();
    assert!(manager.identity_map().is_empty());

    let basket = manager.get(&id).await.unwrap();
    assert!(basket.is_picked_up());
    assert!(!basket.has_recorded_events());
    assert_eq!(basket.version(), 1);
}

#[tokio::test]
async fn get_returns_the_same_instance_until_cleared() {
    let store = inmemory::Store::new();
    let mut manager = manager(&store);
    let id = BasketId::new("b-1");
    manager.add(Basket::pick_up(id.clone())).await.unwrap();

    let first: *const Basket = manager.get(&id).await.unwrap();
    let second: *const Basket = manager.get(&id).await.unwrap();
    assert!(std::ptr::eq(first, second));

    manager.get(&id).await.unwrap().add_product("apple").unwrap();
    assert_eq!(manager.get(&id).await.unwrap().count_of("apple"), 1);

    manager.clear();
    let reloaded = manager.get(&id).await.unwrap();
    assert_eq!(reloaded.count_of("apple"), 0);
}

#[tokio::test]
async fn get_unknown_id_is_not_found() {
    let store = inmemory::Store::new();
    let mut manager = manager(&store);

    let err = manager.get(&BasketId::new("missing")).await.unwrap_err();

    assert!(err.is_not_found());
    assert!(matches!(err, RepositoryError::NotFound { aggregate_kind: "basket", .. }));
    assert!(manager.identity_map().is_empty());
}

#[tokio::test]
async fn flush_persists_every_tracked_aggregate() {
    let store = inmemory::Store::new();
    let mut manager = manager(&store);
    let first = BasketId::new("b-1");
    let second = BasketId::new("b-2");
    manager.add(Basket::pick_up(first.clone())).await.unwrap();
    manager.add(Basket::pick_up(second.clone())).await.unwrap();

    manager.get(&first).await.unwrap().add_product("pear").unwrap();
    {
        let basket = manager.get(&second).await.unwrap();
        basket.add_product("plum").unwrap();
        basket.add_product("plum").unwrap();
    }
    manager.flush().await.unwrap();

    assert_eq!(stored_len(&store, &first).await, 2);
    assert_eq!(stored_len(&store, &second).await, 3);
    assert_eq!(manager.get(&second).await.unwrap().version(), 3);

    // Nothing pending: a second flush writes nothing.
    manager.flush().await.unwrap();
    assert_eq!(stored_len(&store, &second).await, 3);
}

#[tokio::test]
async fn versions_continue_across_flushes() {
    let store = inmemory::Store::new();
    let mut manager = manager(&store);
    let id = BasketId::new("b-1");
    manager.add(Basket::pick_up(id.clone())).await.unwrap();

    for product in ["fig", "kiwi", "lime"] {
        manager.get(&id).await.unwrap().add_product(product).unwrap();
        manager.flush().await.unwrap();
    }

    let versions: Vec<u64> = store
        .read(Basket::KIND, id.as_str())
        .await
        .unwrap()
        .unwrap()
        .iter()
        .map(|envelope| envelope.aggregate_version())
        .collect();
    assert_eq!(versions, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn adding_a_tracked_id_leaves_the_map_untouched() {
    let store = inmemory::Store::new();
    let mut manager = manager(&store);
    let id = BasketId::new("b-1");
    manager.add(Basket::pick_up(id.clone())).await.unwrap();
    let tracked: *const Basket = manager.get(&id).await.unwrap();

    let mut other = Basket::new(id.clone());
    other.add_product("apple").unwrap();
    let err = manager.add(other).await.unwrap_err();

    // `other` was built on version 0 but the stream is at version 1.
    assert!(err.is_concurrency_conflict());
    let still_tracked: *const Basket = manager.get(&id).await.unwrap();
    assert!(std::ptr::eq(tracked, still_tracked));
    assert_eq!(manager.identity_map().len(), 1);
}

#[tokio::test]
async fn new_id_stays_tracked_when_persisting_fails() {
    let store = inmemory::Store::new();
    let id = BasketId::new("b-1");
    manager(&store)
        .add(Basket::pick_up(id.clone()))
        .await
        .unwrap();

    let mut manager = manager(&store);
    let err = manager.add(Basket::pick_up(id.clone())).await.unwrap_err();

    assert!(err.is_concurrency_conflict());
    assert!(manager.identity_map().has(&id));
    assert_eq!(stored_len(&store, &id).await, 1);
}

#[tokio::test]
async fn separate_managers_detect_concurrent_writes() {
    let store = inmemory::Store::new();
    let id = BasketId::new("b-1");
    let mut alice = manager(&store);
    let mut bob = manager(&store);
    alice.add(Basket::pick_up(id.clone())).await.unwrap();

    alice.get(&id).await.unwrap().add_product("pear").unwrap();
    bob.get(&id).await.unwrap().add_product("plum").unwrap();

    alice.flush().await.unwrap();
    let err = bob.flush().await.unwrap_err();

    let RepositoryError::Concurrency(conflict) = err else {
        panic!("expected a concurrency conflict");
    };
    assert_eq!((conflict.expected, conflict.actual), (1, 2));

    bob.clear();
    let fresh = bob.get(&id).await.unwrap();
    assert_eq!(fresh.products(), ["pear".to_string()]);
    fresh.add_product("plum").unwrap();
    bob.flush().await.unwrap();
    assert_eq!(stored_len(&store, &id).await, 3);
}

#[tokio::test]
async fn generated_ids_are_unique_and_parseable() {
    let store = inmemory::Store::new();
    let mut manager = manager(&store);
    let first = BasketId::generate();
    let second = BasketId::generate();
    assert_ne!(first, second);

    manager.add(Basket::pick_up(first.clone())).await.unwrap();
    let parsed: BasketId = first.to_string().parse().unwrap();
    assert_eq!(manager.get(&parsed).await.unwrap().aggregate_id(), &first);
    assert!("".parse::<BasketId>().is_err());
    assert_eq!(<BasketId as Identifier>::TYPE, "basket-id");
}

#[tokio::test]
async fn empty_identifier_is_never_tracked() {
    let store = inmemory::Store::new();
    let mut manager = manager(&store);

    let err = manager.add(Basket::pick_up(BasketId::new(""))).await.unwrap_err();

    assert!(matches!(err, RepositoryError::InvalidId(_)));
    assert!(manager.identity_map().is_empty());
    assert_eq!(store.stream_count(), 0);
}
