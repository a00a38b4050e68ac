//! Two writers load the same basket; the second to save is rejected with a
//! concurrency conflict, reloads, and retries.
//!
//! Run with: `cargo run --example optimistic_concurrency`

use rehydrate::{
    Aggregate, AggregateFactory, Apply, Create, DomainEvent, EventRecorder, Identifier,
    Repository, RepositoryError, store::inmemory,
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
    let id = BasketId::generate();
    repository.add(&mut Basket::pick_up(id.clone())).await?;

    let mut alice: Basket = repository.get(&id).await?;
    let mut bob: Basket = repository.get(&id).await?;
    println!("both writers loaded version {}", alice.version());

    alice.add_product("pears");
    repository.add(&mut alice).await?;
    println!("alice saved, stream is at version {}", alice.version());

    bob.add_product("plums");
    match repository.add(&mut bob).await {
        Err(RepositoryError::Concurrency(conflict)) => {
            println!(
                "bob rejected: expected version {}, stream is at {}",
                conflict.expected, conflict.actual
            );
        }
        other => return Err(format!("expected a conflict, got {other:?}").into()),
    }
    // The rejected events are still pending on bob's stale copy.
    assert!(bob.has_recorded_events());

    let mut bob: Basket = repository.get(&id).await?;
    bob.add_product("plums");
    repository.add(&mut bob).await?;

    let basket: Basket = repository.get(&id).await?;
    println!(
        "final basket at version {}: {:?}",
        basket.version(),
        basket.products
    );
    assert_eq!(basket.products, ["pears".to_string(), "plums".to_string()]);
    Ok(())
}
