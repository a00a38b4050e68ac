#![doc = include_str!("../README.md")]

#[cfg(feature = "test-util")]
pub use rehydrate_core::test;
pub use rehydrate_core::{
    aggregate,
    aggregate::{Aggregate, Apply, Create, EventRecorder, UnhandledEventError},
    concurrency,
    concurrency::ConcurrencyConflict,
    decorator,
    decorator::{EnvelopeDecorator, StaticMetadata},
    envelope,
    envelope::{AggregateHistory, EventEnvelope, EventStream, Metadata},
    event,
    event::{AggregateEvent, DomainEvent, EventDecodeError, EventKind},
    factory,
    factory::{AggregateFactory, AggregateTypeMap},
    id,
    id::Identifier,
    identity_map,
    identity_map::IdentityMap,
    manager,
    manager::AggregateManager,
    naming,
    naming::{EventNameResolver, KindNames, NameRegistry},
    repository,
    repository::{Repository, RepositoryError},
    wrapper,
    wrapper::EventWrapper,
};
// Re-export proc macro derives so consumers only depend on `rehydrate`.
pub use rehydrate_macros::{Aggregate, Identifier};

// Used by the code `#[derive(Aggregate)]` generates.
#[doc(hidden)]
pub use serde_json;

pub mod store {

    pub use rehydrate_core::store::{EventStore, RawEventStream, StreamKey};

    // Re-export low-level append types for EventStore implementors only.
    // Most users should interact with the Repository API instead.
    #[doc(hidden)]
    pub use rehydrate_core::store::AppendError;

    pub use rehydrate_core::store::inmemory;
}
