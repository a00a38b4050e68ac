extern crate self as rehydrate;

#[path = "../common.rs"]
mod support;

pub use support::{aggregate, event, id, serde_json, Aggregate, Apply, Create, DomainEvent, EventRecorder, Identifier};

use rehydrate_macros::{Aggregate, Identifier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Identifier)]
pub struct BasketId(String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketPickedUp {
    pub basket_id: String,
}

impl DomainEvent for BasketPickedUp {
    const KIND: &'static str = "basket-picked-up";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAdded {
    pub product: String,
}

impl DomainEvent for ProductAdded {
    const KIND: &'static str = "product-added";
}

pub struct BasketError;

#[derive(Aggregate)]
#[aggregate(
    error = BasketError,
    events(BasketPickedUp, ProductAdded),
    create(BasketPickedUp)
)]
pub struct Basket {
    #[aggregate(id)]
    pub id: BasketId,
    #[aggregate(recorder)]
    pub recorder: EventRecorder<BasketEvent>,
}

impl Create<BasketPickedUp> for Basket {
    fn create(event: &BasketPickedUp) -> Self {
        Self {
            id: BasketId(event.basket_id.clone()),
            recorder: EventRecorder::default(),
        }
    }
}

impl Apply<BasketPickedUp> for Basket {
    fn apply(&mut self, _: &BasketPickedUp) {}
}

fn main() {}
