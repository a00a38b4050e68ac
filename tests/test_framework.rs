//! Aggregate behavior tests using the test utilities.
//! Run with `cargo test --features test-util`.

#![cfg(feature = "test-util")]

mod common;

use common::{Basket, BasketError, BasketId, added, basket_repository, picked_up};
use rehydrate::{
    Aggregate,
    store::inmemory,
    test::{RepositoryTestExt, TestFramework, replay},
};

fn basket_id() -> BasketId {
    BasketId::new("b-1")
}

#[test]
fn picking_up_records_creation_event() {
    TestFramework::<Basket>::when_created(|| Ok(Basket::pick_up(basket_id())))
        .then_expect_events(&[picked_up(&basket_id())]);
}

#[test]
fn adding_a_product_records_it() {
    let id = basket_id();
    TestFramework::<Basket>::given(vec![picked_up(&id)])
        .when(|basket| basket.add_product("apple"))
        .then_expect_events(&[added(&id, "apple")]);
}

#[test]
fn fourth_of_a_product_is_rejected() {
    let id = basket_id();
    TestFramework::<Basket>::given(vec![picked_up(&id), added(&id, "apple")])
        .and(vec![added(&id, "apple"), added(&id, "apple")])
        .when(|basket| basket.add_product("apple"))
        .then_expect_error_eq(&BasketError::ProductLimitReached {
            product: "apple".into(),
        });
}

#[test]
fn limit_applies_per_product() {
    let id = basket_id();
    TestFramework::<Basket>::given(vec![
        added(&id, "apple"),
        added(&id, "apple"),
        added(&id, "apple"),
    ])
    .when(|basket| basket.add_product("pear"))
    .then_expect_state(|basket| {
        assert_eq!(basket.count_of("apple"), 3);
        assert_eq!(basket.count_of("pear"), 1);
        assert_eq!(basket.version(), 3);
    });
}

#[test]
fn rejection_message_names_the_product() {
    let id = basket_id();
    TestFramework::<Basket>::given(vec![
        added(&id, "fig"),
        added(&id, "fig"),
        added(&id, "fig"),
    ])
    .when(|basket| basket.add_product("fig"))
    .then_expect_error_message("`fig`");
}

#[test]
fn raw_outcome_is_available_for_custom_checks() {
    let id = basket_id();
    let events = TestFramework::<Basket>::given(vec![picked_up(&id)])
        .when(|basket| {
            basket.add_product("pear")?;
            basket.add_product("plum")
        })
        .inspect_result()
        .unwrap();
    assert_eq!(events, [added(&id, "pear"), added(&id, "plum")]);

    let rejected = TestFramework::<Basket>::given(vec![
        added(&id, "fig"),
        added(&id, "fig"),
        added(&id, "fig"),
    ])
    .when(|basket| basket.add_product("fig"))
    .inspect_result();
    assert!(matches!(
        rejected,
        Err(BasketError::ProductLimitReached { ref product }) if product == "fig"
    ));
}

#[test]
fn replay_does_not_run_guards() {
    let id = basket_id();
    let history = nonempty::nonempty![
        added(&id, "fig"),
        added(&id, "fig"),
        added(&id, "fig"),
        added(&id, "fig"),
    ];

    let basket: Basket = replay(history).unwrap();

    assert_eq!(basket.count_of("fig"), 4);
    assert!(!basket.has_recorded_events());
}

#[test]
fn starting_from_an_instance_discards_its_pending_events() {
    TestFramework::with(Basket::pick_up(basket_id()))
        .when(|_| Ok(()))
        .then_expect_no_events();
}

#[tokio::test]
async fn seeded_history_is_loaded_by_the_repository() {
    let repository = basket_repository(inmemory::Store::new());
    let id = basket_id();

    repository
        .seed_events::<Basket>(&id, vec![picked_up(&id), added(&id, "kiwi")])
        .await
        .unwrap();

    let basket: Basket = repository.get(&id).await.unwrap();
    assert_eq!(basket.version(), 2);
    assert_eq!(basket.products(), ["kiwi".to_string()]);
}

#[tokio::test]
async fn injected_event_conflicts_with_loaded_instance() {
    let repository = basket_repository(inmemory::Store::new());
    let id = basket_id();
    repository
        .seed_events::<Basket>(&id, vec![picked_up(&id)])
        .await
        .unwrap();

    let mut basket: Basket = repository.get(&id).await.unwrap();
    repository
        .inject_concurrent_event::<Basket>(&id, added(&id, "lime"))
        .await
        .unwrap();

    basket.add_product("lime").unwrap();
    let err = repository.add(&mut basket).await.unwrap_err();
    assert!(err.is_concurrency_conflict());
}
