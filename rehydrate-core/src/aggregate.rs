//! Command-side domain primitives.
//!
//! This module defines the building blocks for aggregates: recording
//! (`Aggregate::record_that`), state mutation (`Apply`), construction from the
//! first event (`Create`) and reconstruction from history
//! (`Aggregate::from_history`). The `#[derive(Aggregate)]` macro generates
//! the event enum and the dispatch between them.

use nonempty::NonEmpty;
use thiserror::Error;

use crate::{envelope::AggregateHistory, event::AggregateEvent, id::Identifier};

/// An aggregate has no application logic for an event present in its
/// history.
///
/// This signals a mismatched aggregate/event-type binding and is fatal for
/// the load that hit it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnhandledEventError {
    /// A stored event name matches none of the aggregate's event kinds.
    #[error("aggregate `{aggregate_kind}` has no event named `{event_name}`")]
    UnknownEvent {
        aggregate_kind: &'static str,
        event_name: String,
    },
    /// A history starts with an event that cannot create the aggregate.
    #[error("event `{event_kind}` cannot create aggregate `{aggregate_kind}`")]
    NotACreationEvent {
        aggregate_kind: &'static str,
        event_kind: &'static str,
    },
}

/// Transient bookkeeping embedded in every aggregate.
///
/// Holds the recorded events not yet handed to the repository and the number
/// of events already committed for this aggregate. Neither is persisted as
/// aggregate state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecorder<E> {
    pending: Vec<E>,
    version: u64,
}

impl<E> Default for EventRecorder<E> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            version: 0,
        }
    }
}

impl<E> EventRecorder<E> {
    #[must_use]
    pub fn pending(&self) -> &[E] {
        &self.pending
    }

    /// Committed version: 0 until the first event has been stored.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    fn record(&mut self, event: E) {
        self.pending.push(event);
    }

    fn erase(&mut self) {
        self.pending.clear();
    }

    pub(crate) const fn restore(&mut self, version: u64) {
        self.version = version;
    }

    pub(crate) const fn advance(&mut self, committed: u64) {
        self.version += committed;
    }
}

/// Event-sourced entity.
///
/// Behavior methods validate business rules and call
/// [`record_that`](Self::record_that); they never mutate state directly.
/// State changes happen only in [`apply`](Self::apply), which is shared by
/// recording and by replay. Replay goes through
/// [`from_history`](Self::from_history), which applies events without
/// recording them and without running any behavior guard.
///
/// Most aggregates derive this trait:
///
/// ```ignore
/// #[derive(Aggregate)]
/// #[aggregate(error = BasketError, events(BasketPickedUp, ProductAdded), create(BasketPickedUp))]
/// pub struct Basket {
///     #[aggregate(id)]
///     id: BasketId,
///     #[aggregate(recorder)]
///     recorder: EventRecorder<BasketEvent>,
///     products: Vec<String>,
/// }
/// ```
// ANCHOR: aggregate_trait
pub trait Aggregate: Sized {
    /// Aggregate-variant key. Use lowercase kebab-case: `"basket"`.
    const KIND: &'static str;

    type Id: Identifier;
    type Event: AggregateEvent;
    /// Domain error raised by behavior methods.
    type Error;

    fn aggregate_id(&self) -> &Self::Id;

    fn recorder(&self) -> &EventRecorder<Self::Event>;

    fn recorder_mut(&mut self) -> &mut EventRecorder<Self::Event>;

    /// Build the aggregate from the first event of its history.
    ///
    /// # Errors
    ///
    /// Returns [`UnhandledEventError::NotACreationEvent`] if the event cannot
    /// start this aggregate's life.
    fn create(event: &Self::Event) -> Result<Self, UnhandledEventError>;

    /// Apply an event to update aggregate state.
    ///
    /// When using `#[derive(Aggregate)]`, this is an exhaustive match that
    /// dispatches to your `Apply<E>` implementations.
    fn apply(&mut self, event: &Self::Event);

    /// Record a new event, then apply it.
    fn record_that(&mut self, event: impl Into<Self::Event>) {
        let event = event.into();
        self.recorder_mut().record(event.clone());
        self.apply(&event);
    }

    /// Events recorded since the last hand-off to the repository.
    fn recorded_events(&self) -> &[Self::Event] {
        self.recorder().pending()
    }

    fn has_recorded_events(&self) -> bool {
        !self.recorded_events().is_empty()
    }

    /// Clear the pending buffer.
    ///
    /// Called by the repository once the events have been handed off for
    /// persistence; behavior methods must not call it.
    fn erase_recorded_events(&mut self) {
        self.recorder_mut().erase();
    }

    /// Number of this aggregate's events already in the store.
    fn version(&self) -> u64 {
        self.recorder().version()
    }

    /// Rebuild an aggregate by replaying its history.
    ///
    /// Nothing is recorded and no behavior guard runs: the first event goes
    /// through [`create`](Self::create), the rest through
    /// [`apply`](Self::apply).
    ///
    /// # Errors
    ///
    /// Returns [`UnhandledEventError`] if the first event is not a creation
    /// event for this aggregate.
    fn from_history(history: AggregateHistory<Self::Event>) -> Result<Self, UnhandledEventError> {
        let version = history.len() as u64;
        let NonEmpty { head, tail } = history.into_inner();
        let mut aggregate = Self::create(&head)?;
        for event in &tail {
            aggregate.apply(event);
        }
        aggregate.recorder_mut().restore(version);
        Ok(aggregate)
    }
}
// ANCHOR_END: aggregate_trait

/// Mutate an aggregate with a domain event.
///
/// ```ignore
/// impl Apply<ProductAdded> for Basket {
///     fn apply(&mut self, event: &ProductAdded) {
///         self.products.push(event.product.clone());
///     }
/// }
/// ```
// ANCHOR: apply_trait
pub trait Apply<E> {
    fn apply(&mut self, event: &E);
}
// ANCHOR_END: apply_trait

/// Construct an aggregate from the event that starts its life.
///
/// Listed in the derive's `create(...)` attribute. Aggregates without any
/// creation event fall back to `Default` followed by `apply`.
pub trait Create<E> {
    fn create(event: &E) -> Self;
}
