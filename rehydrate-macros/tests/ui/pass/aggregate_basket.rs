extern crate self as rehydrate;

#[path = "../common.rs"]
mod support;

pub use support::{
    aggregate, event, id, serde_json, Aggregate, Apply, Create, DomainEvent, EventRecorder,
    Identifier,
};

use rehydrate_macros::{Aggregate, Identifier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Identifier)]
pub struct BasketId(String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketPickedUp {
    pub basket_id: String,
}

impl DomainEvent for BasketPickedUp {
    const KIND: &'static str = "basket-picked-up";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAdded {
    pub product: String,
}

impl DomainEvent for ProductAdded {
    const KIND: &'static str = "product-added";
}

#[derive(Debug)]
pub struct BasketError;

#[derive(Aggregate)]
#[aggregate(
    error = BasketError,
    events(BasketPickedUp, ProductAdded),
    create(BasketPickedUp),
    derives(Debug, PartialEq)
)]
pub struct Basket {
    #[aggregate(id)]
    pub id: BasketId,
    #[aggregate(recorder)]
    pub recorder: EventRecorder<BasketEvent>,
    pub products: Vec<String>,
}

impl Create<BasketPickedUp> for Basket {
    fn create(event: &BasketPickedUp) -> Self {
        Self {
            id: BasketId(event.basket_id.clone()),
            recorder: EventRecorder::default(),
            products: Vec::new(),
        }
    }
}

impl Apply<BasketPickedUp> for Basket {
    fn apply(&mut self, _: &BasketPickedUp) {}
}

impl Apply<ProductAdded> for Basket {
    fn apply(&mut self, event: &ProductAdded) {
        self.products.push(event.product.clone());
    }
}

fn main() {
    let id: BasketId = "b-1".parse().unwrap();
    let mut basket = <Basket as Aggregate>::create(&BasketEvent::from(BasketPickedUp {
        basket_id: id.to_string(),
    }))
    .unwrap();
    basket.record_that(ProductAdded {
        product: "apple".into(),
    });

    assert_eq!(basket.aggregate_id().as_str(), "b-1");
    assert_eq!(basket.products, ["apple".to_string()]);
    assert_eq!(Basket::KIND, "basket");
    assert_eq!(<BasketId as Identifier>::TYPE, "basket-id");
}
