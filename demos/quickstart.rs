//! The README walkthrough: record events, persist them through an
//! `AggregateManager`, and rebuild the aggregate from the store.
//!
//! Run with: `cargo run --example quickstart`

use rehydrate::{
    Aggregate, AggregateFactory, AggregateManager, Apply, Create, DomainEvent, EventRecorder,
    Identifier, Repository, store::inmemory,
};
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

#[derive(Debug, Aggregate)]
#[aggregate(
    error = String,
    events(BasketPickedUp, ProductAdded),
    create(BasketPickedUp),
    derives(Debug, PartialEq)
)]
pub struct Basket {
    #[aggregate(id)]
    id: BasketId,
    #[aggregate(recorder)]
    recorder: EventRecorder<BasketEvent>,
    products: Vec<String>,
}

impl Basket {
    pub fn pick_up(id: BasketId) -> Self {
        let mut basket = Self {
            id: id.clone(),
            recorder: EventRecorder::default(),
            products: Vec::new(),
        };
        basket.record_that(BasketPickedUp {
            basket_id: id.to_string(),
        });
        basket
    }

    pub fn add_product(&mut self, product: &str) {
        self.record_that(ProductAdded {
            product: product.to_string(),
        });
    }
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let repository = Repository::new(
        inmemory::Store::new(),
        AggregateFactory::default().register::<Basket>(),
    );
    let mut manager = AggregateManager::<_, Basket>::new(repository);

    let id = BasketId::generate();
    manager.add(Basket::pick_up(id.clone())).await?;
    println!("picked up basket {id}");

    let basket = manager.get(&id).await?;
    basket.add_product("apples");
    manager.flush().await?;
    println!("flushed pending events");

    manager.clear();
    let basket = manager.get(&id).await?;
    assert_eq!(basket.products, vec!["apples".to_string()]);
    assert_eq!(basket.version(), 2);
    println!(
        "reloaded basket {id} at version {}: {:?}",
        basket.version(),
        basket.products
    );
    Ok(())
}
