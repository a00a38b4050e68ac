// Stands in for the `rehydrate` facade so UI cases resolve the paths the
// derives generate without a dependency cycle.
pub use rehydrate_core::{aggregate, event, id};
pub use rehydrate_core::aggregate::{Aggregate, Apply, Create, EventRecorder};
pub use rehydrate_core::event::DomainEvent;
pub use rehydrate_core::id::Identifier;
pub use serde_json;
