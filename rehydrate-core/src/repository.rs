//! Aggregate persistence orchestration.
//!
//! `Repository` coordinates the event wrapper, the event store and the
//! aggregate factory: [`add`](Repository::add) persists the events an
//! aggregate has recorded, [`get`](Repository::get) rebuilds an aggregate
//! from its stored stream.
//!
//! Conflicts and missing aggregates are reported to the caller, never
//! retried.

use std::sync::Arc;

use nonempty::NonEmpty;
use thiserror::Error;

use crate::{
    aggregate::Aggregate,
    concurrency::ConcurrencyConflict,
    decorator::EnvelopeDecorator,
    factory::{AggregateFactory, FactoryError},
    id::{Identifier, IdentifierError, ensure_non_empty},
    naming::NameResolutionError,
    store::{AppendError, EventStore},
    wrapper::{DecodeError, EmptyStreamError, EventWrapper},
};

/// Error type for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError<StoreError>
where
    StoreError: std::error::Error + 'static,
{
    /// The store has no stream for the identifier.
    #[error("aggregate `{aggregate_kind}` with id `{id}` not found")]
    NotFound {
        aggregate_kind: &'static str,
        id: String,
    },
    /// The aggregate's identifier serializes to an empty string.
    #[error(transparent)]
    InvalidId(#[from] IdentifierError),
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyConflict),
    #[error(transparent)]
    NameResolution(#[from] NameResolutionError),
    #[error(transparent)]
    EmptyStream(#[from] EmptyStreamError),
    #[error("failed to decode stored events: {0}")]
    Decode(#[from] DecodeError),
    #[error("failed to encode events: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Factory(#[from] FactoryError),
    #[error("failed to persist events: {0}")]
    Store(#[source] StoreError),
}

impl<StoreError: std::error::Error + 'static> RepositoryError<StoreError> {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub const fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Self::Concurrency(_))
    }
}

/// Result type alias for repository operations.
pub type RepositoryResult<T, S> = Result<T, RepositoryError<<S as EventStore>::Error>>;

/// Repository.
pub struct Repository<S>
where
    S: EventStore,
{
    pub(crate) store: S,
    factory: AggregateFactory,
    pub(crate) wrapper: EventWrapper,
    decorators: Vec<Arc<dyn EnvelopeDecorator>>,
}

impl<S> Clone for Repository<S>
where
    S: EventStore + Clone,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            factory: self.factory.clone(),
            wrapper: self.wrapper.clone(),
            decorators: self.decorators.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Repository<S>
where
    S: EventStore + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("store", &self.store)
            .field("factory", &self.factory)
            .field("decorators", &self.decorators.len())
            .finish_non_exhaustive()
    }
}

impl<S> Repository<S>
where
    S: EventStore,
{
    /// Repository with the default wrapper: UUID v7 envelope ids and event
    /// kinds as names.
    #[must_use]
    pub fn new(store: S, factory: AggregateFactory) -> Self {
        Self {
            store,
            factory,
            wrapper: EventWrapper::default(),
            decorators: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_wrapper(self, wrapper: EventWrapper) -> Self {
        Self { wrapper, ..self }
    }

    /// Register a decorator. Decorators run in registration order.
    #[must_use]
    pub fn with_decorator(mut self, decorator: impl EnvelopeDecorator + 'static) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    #[must_use]
    pub const fn event_store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn factory(&self) -> &AggregateFactory {
        &self.factory
    }

    #[must_use]
    pub const fn wrapper(&self) -> &EventWrapper {
        &self.wrapper
    }

    /// Persist the events `aggregate` has recorded.
    ///
    /// Does nothing if there are none. Otherwise the pending buffer is
    /// erased, the events are wrapped on top of the aggregate's committed
    /// version, decorated and appended. On success the committed version
    /// advances by the number of events appended.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::InvalidId`] if the aggregate's identifier is
    ///   empty. Nothing is erased or written in that case.
    /// - [`RepositoryError::Concurrency`] if another writer appended to the
    ///   stream since the aggregate was loaded.
    /// - [`RepositoryError::NameResolution`] if an event kind has no name.
    /// - [`RepositoryError::Encode`] if an event cannot be serialized.
    /// - [`RepositoryError::Store`] if persistence fails.
    ///
    /// The pending buffer is erased in every case.
    #[tracing::instrument(
        skip(self, aggregate),
        fields(aggregate_kind = A::KIND, aggregate_id = %aggregate.aggregate_id())
    )]
    pub async fn add<A>(&self, aggregate: &mut A) -> RepositoryResult<(), S>
    where
        A: Aggregate,
    {
        let Some(events) = NonEmpty::from_slice(aggregate.recorded_events()) else {
            tracing::trace!("no recorded events, nothing to persist");
            return Ok(());
        };
        ensure_non_empty(aggregate.aggregate_id())?;
        aggregate.erase_recorded_events();

        let base_version = aggregate.version();
        let event_count = events.len();
        let stream = self
            .wrapper
            .wrap(events, aggregate.aggregate_id(), base_version)?
            .try_map_events(|event| serde_json::to_value(&event))
            .map_err(RepositoryError::Encode)?
            .map_envelopes(|envelope| {
                self.decorators
                    .iter()
                    .fold(envelope, |envelope, decorator| decorator.decorate(envelope))
            });

        match self.store.append(A::KIND, base_version, stream).await {
            Ok(()) => {}
            Err(AppendError::Conflict(conflict)) => {
                tracing::debug!(%conflict, "append rejected");
                return Err(RepositoryError::Concurrency(conflict));
            }
            Err(AppendError::Store(err)) => return Err(RepositoryError::Store(err)),
            Err(AppendError::EmptyAppend) => unreachable!("wrapped streams are never empty"),
        }

        aggregate.recorder_mut().advance(event_count as u64);
        tracing::debug!(
            event_count,
            version = aggregate.version(),
            "aggregate events persisted"
        );
        Ok(())
    }

    /// Rebuild an aggregate from its full stored stream.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::InvalidId`] if `id` is empty.
    /// - [`RepositoryError::NotFound`] if the store has no stream for `id`.
    /// - [`RepositoryError::Decode`] if a stored event cannot be mapped back
    ///   to the aggregate's events.
    /// - [`RepositoryError::Factory`] if the aggregate cannot be
    ///   reconstituted.
    /// - [`RepositoryError::Store`] if loading fails.
    #[tracing::instrument(skip(self, id), fields(aggregate_kind = A::KIND, aggregate_id = %id))]
    pub async fn get<A>(&self, id: &A::Id) -> RepositoryResult<A, S>
    where
        A: Aggregate,
    {
        ensure_non_empty(id)?;
        let Some(stream) = self
            .store
            .read(A::KIND, id.as_str())
            .await
            .map_err(RepositoryError::Store)?
        else {
            tracing::debug!("no stream stored");
            return Err(RepositoryError::NotFound {
                aggregate_kind: A::KIND,
                id: id.to_string(),
            });
        };

        let stream = self.wrapper.decode::<A::Event>(A::KIND, stream)?;
        let history = self.wrapper.unwrap(stream)?;
        let aggregate = self.factory.reconstitute::<A>(history)?;
        tracing::trace!(version = aggregate.version(), "aggregate reconstituted");
        Ok(aggregate)
    }
}
