use rehydrate_macros::Aggregate;

pub struct BasketError;

pub struct BasketPickedUp;

#[derive(Aggregate)]
#[aggregate(error = BasketError, events(BasketPickedUp))]
pub struct Basket {
    pub owner: String,
}

fn main() {}
