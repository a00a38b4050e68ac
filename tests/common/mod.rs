//! Shopping-basket domain shared by the integration tests.

#![allow(dead_code)]

use rehydrate::{
    Aggregate, AggregateFactory, Apply, Create, DomainEvent, EventRecorder, Identifier,
    Repository, store::inmemory,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_PER_PRODUCT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Identifier)]
pub struct BasketId(String);

impl BasketId {
    pub fn new(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketPickedUp {
    pub basket_id: String,
}

impl DomainEvent for BasketPickedUp {
    const KIND: &'static str = "basket-picked-up";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAdded {
    pub basket_id: String,
    pub product: String,
}

impl DomainEvent for ProductAdded {
    const KIND: &'static str = "product-added";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BasketError {
    #[error("no more than {MAX_PER_PRODUCT} of `{product}` per basket")]
    ProductLimitReached { product: String },
}

#[derive(Debug, Clone, Aggregate)]
#[aggregate(
    error = BasketError,
    events(BasketPickedUp, ProductAdded),
    create(BasketPickedUp, ProductAdded),
    derives(Debug, PartialEq, Eq)
)]
pub struct Basket {
    #[aggregate(id)]
    id: BasketId,
    #[aggregate(recorder)]
    recorder: EventRecorder<BasketEvent>,
    picked_up: bool,
    products: Vec<String>,
}

impl Basket {
    /// Empty basket; records nothing.
    pub fn new(id: BasketId) -> Self {
        Self {
            id,
            recorder: EventRecorder::default(),
            picked_up: false,
            products: Vec::new(),
        }
    }

    pub fn pick_up(id: BasketId) -> Self {
        let mut basket = Self::new(id);
        basket.record_that(BasketPickedUp {
            basket_id: basket.id.to_string(),
        });
        basket
    }

    pub fn add_product(&mut self, product: &str) -> Result<(), BasketError> {
        if self.count_of(product) >= MAX_PER_PRODUCT {
            return Err(BasketError::ProductLimitReached {
                product: product.to_string(),
            });
        }
        self.record_that(ProductAdded {
            basket_id: self.id.to_string(),
            product: product.to_string(),
        });
        Ok(())
    }

    pub fn count_of(&self, product: &str) -> usize {
        self.products.iter().filter(|p| *p == product).count()
    }

    pub const fn is_picked_up(&self) -> bool {
        self.picked_up
    }

    pub fn products(&self) -> &[String] {
        &self.products
    }
}

impl Create<BasketPickedUp> for Basket {
    fn create(event: &BasketPickedUp) -> Self {
        let mut basket = Self::new(BasketId::new(&event.basket_id));
        basket.picked_up = true;
        basket
    }
}

impl Create<ProductAdded> for Basket {
    fn create(event: &ProductAdded) -> Self {
        let mut basket = Self::new(BasketId::new(&event.basket_id));
        basket.products.push(event.product.clone());
        basket
    }
}

impl Apply<BasketPickedUp> for Basket {
    fn apply(&mut self, _: &BasketPickedUp) {
        self.picked_up = true;
    }
}

impl Apply<ProductAdded> for Basket {
    fn apply(&mut self, event: &ProductAdded) {
        self.products.push(event.product.clone());
    }
}

pub fn added(id: &BasketId, product: &str) -> BasketEvent {
    ProductAdded {
        basket_id: id.to_string(),
        product: product.to_string(),
    }
    .into()
}

pub fn picked_up(id: &BasketId) -> BasketEvent {
    BasketPickedUp {
        basket_id: id.to_string(),
    }
    .into()
}

pub fn basket_factory() -> AggregateFactory {
    AggregateFactory::default().register::<Basket>()
}

pub fn basket_repository(store: inmemory::Store) -> Repository<inmemory::Store> {
    Repository::new(store, basket_factory())
}
