//! Public entry point: identity map in front of a repository.
//!
//! An `AggregateManager` is a unit of work. Within it, every identifier
//! resolves to one live aggregate instance: the first [`get`] loads from the
//! store, later calls hand out the same instance until [`clear`].
//!
//! [`get`]: AggregateManager::get
//! [`clear`]: AggregateManager::clear

use crate::{
    aggregate::Aggregate,
    id::ensure_non_empty,
    identity_map::IdentityMap,
    repository::{Repository, RepositoryResult},
    store::EventStore,
};

/// Identity map plus repository for one aggregate type.
pub struct AggregateManager<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    repository: Repository<S>,
    identity_map: IdentityMap<A>,
}

impl<S, A> AggregateManager<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    #[must_use]
    pub fn new(repository: Repository<S>) -> Self {
        Self {
            repository,
            identity_map: IdentityMap::new(),
        }
    }

    #[must_use]
    pub const fn repository(&self) -> &Repository<S> {
        &self.repository
    }

    #[must_use]
    pub const fn identity_map(&self) -> &IdentityMap<A> {
        &self.identity_map
    }

    /// Track an aggregate and persist its recorded events.
    ///
    /// A new identifier enters the identity map before anything is written,
    /// and stays there if persisting fails. If the map already holds an
    /// instance for the identifier, that instance is left in place and only
    /// `aggregate`'s events are persisted.
    ///
    /// An aggregate with an empty identifier is rejected before it is
    /// tracked.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::InvalidId`](crate::repository::RepositoryError::InvalidId)
    /// for an empty identifier and propagates every other [`Repository::add`]
    /// error unchanged.
    #[tracing::instrument(
        skip(self, aggregate),
        fields(aggregate_kind = A::KIND, aggregate_id = %aggregate.aggregate_id())
    )]
    pub async fn add(&mut self, mut aggregate: A) -> RepositoryResult<(), S> {
        ensure_non_empty(aggregate.aggregate_id())?;
        if self.identity_map.has(aggregate.aggregate_id()) {
            tracing::trace!("identifier already tracked, persisting given instance only");
            return self.repository.add(&mut aggregate).await;
        }
        tracing::trace!("tracking new aggregate");
        let tracked = self.identity_map.add(aggregate);
        self.repository.add(tracked).await
    }

    /// The live instance for `id`, loading it on first access.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`](crate::repository::RepositoryError::NotFound)
    /// if `id` is neither tracked nor stored, and propagates every other
    /// [`Repository::get`] error unchanged.
    #[tracing::instrument(skip(self, id), fields(aggregate_kind = A::KIND, aggregate_id = %id))]
    pub async fn get(&mut self, id: &A::Id) -> RepositoryResult<&mut A, S> {
        if !self.identity_map.has(id) {
            tracing::trace!("identity map miss");
            let aggregate = self.repository.get::<A>(id).await?;
            return Ok(self.identity_map.add(aggregate));
        }
        tracing::trace!("identity map hit");
        match self.identity_map.get_mut(id) {
            Ok(aggregate) => Ok(aggregate),
            Err(err) => unreachable!("checked above: {err}"),
        }
    }

    /// Persist the recorded events of every tracked aggregate.
    ///
    /// Stops at the first failure; aggregates already flushed stay flushed.
    ///
    /// # Errors
    ///
    /// Propagates the first [`Repository::add`] error.
    #[tracing::instrument(skip(self), fields(aggregate_kind = A::KIND, tracked = self.identity_map.len()))]
    pub async fn flush(&mut self) -> RepositoryResult<(), S> {
        for aggregate in self.identity_map.values_mut() {
            self.repository.add(aggregate).await?;
        }
        Ok(())
    }

    /// Forget every tracked instance. Stored events are not touched.
    pub fn clear(&mut self) {
        tracing::trace!(dropped = self.identity_map.len(), "clearing identity map");
        self.identity_map.clear();
    }
}

impl<S, A> std::fmt::Debug for AggregateManager<S, A>
where
    S: EventStore + std::fmt::Debug,
    A: Aggregate + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateManager")
            .field("repository", &self.repository)
            .field("identity_map", &self.identity_map)
            .finish()
    }
}
