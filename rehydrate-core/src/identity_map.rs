//! Session-scoped identity map.
//!
//! Holds at most one live instance per aggregate identifier. Entries stay
//! until the whole map is cleared; there is no eviction, size bound or TTL.
//! One map belongs to one unit of work: it is a plain owned value, and
//! sharing it between threads takes an external lock around it.

use std::collections::{HashMap, hash_map::Entry};

use thiserror::Error;

use crate::{aggregate::Aggregate, id::Identifier};

/// The identifier is not in the map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityMapError {
    #[error("aggregate `{id}` is not in the identity map")]
    NotInMap { id: String },
}

/// Serialized identifier → owned aggregate.
#[derive(Debug)]
pub struct IdentityMap<A: Aggregate> {
    entries: HashMap<String, A>,
}

impl<A: Aggregate> Default for IdentityMap<A> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<A: Aggregate> IdentityMap<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has(&self, id: &A::Id) -> bool {
        self.entries.contains_key(id.as_str())
    }

    /// # Errors
    ///
    /// Returns [`IdentityMapError::NotInMap`] if `id` has no entry.
    pub fn get(&self, id: &A::Id) -> Result<&A, IdentityMapError> {
        self.entries.get(id.as_str()).ok_or_else(|| not_in_map(id))
    }

    /// # Errors
    ///
    /// Returns [`IdentityMapError::NotInMap`] if `id` has no entry.
    pub fn get_mut(&mut self, id: &A::Id) -> Result<&mut A, IdentityMapError> {
        self.entries
            .get_mut(id.as_str())
            .ok_or_else(|| not_in_map(id))
    }

    /// Insert an aggregate, replacing any entry with the same identifier.
    pub fn add(&mut self, aggregate: A) -> &mut A {
        let key = aggregate.aggregate_id().as_str().to_string();
        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                entry.insert(aggregate);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(aggregate),
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut A> {
        self.entries.values_mut()
    }
}

fn not_in_map(id: &impl Identifier) -> IdentityMapError {
    IdentityMapError::NotInMap { id: id.to_string() }
}
