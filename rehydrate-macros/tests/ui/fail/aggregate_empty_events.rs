use rehydrate_macros::Aggregate;

pub struct BasketError;

#[derive(Aggregate)]
#[aggregate(error = BasketError, events())]
pub struct Basket {}

fn main() {}
