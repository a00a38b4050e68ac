//! Envelopes, event streams and aggregate histories.
//!
//! An [`EventEnvelope`] is a domain event plus the persistence metadata
//! assigned when it is wrapped. An [`EventStream`] is the ordered sequence of
//! envelopes for one aggregate; an [`AggregateHistory`] is the same sequence
//! with the envelopes stripped, used to rebuild the aggregate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Free-form key/value metadata carried by an envelope. Empty by default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, serde_json::Value>);

impl Metadata {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn with(mut self, key: String, value: serde_json::Value) -> Self {
        self.0.insert(key, value);
        self
    }
}

/// A domain event plus the metadata assigned when it was wrapped.
///
/// The envelope id, event name, event and aggregate version are immutable
/// once assigned. Metadata can only be added through
/// [`with_metadata`](Self::with_metadata), which returns a new envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    envelope_id: Uuid,
    event_name: String,
    event: E,
    aggregate_version: u64,
    occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    metadata: Metadata,
}

impl<E> EventEnvelope<E> {
    /// Assemble an envelope from its parts.
    ///
    /// The event wrapper is the normal source of envelopes; stores that keep
    /// their own representation use this to materialize envelopes on read.
    pub fn from_parts(
        envelope_id: Uuid,
        event_name: impl Into<String>,
        event: E,
        aggregate_version: u64,
        occurred_at: DateTime<Utc>,
        metadata: Metadata,
    ) -> Self {
        Self {
            envelope_id,
            event_name: event_name.into(),
            event,
            aggregate_version,
            occurred_at,
            metadata,
        }
    }

    #[must_use]
    pub const fn envelope_id(&self) -> Uuid {
        self.envelope_id
    }

    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    #[must_use]
    pub const fn event(&self) -> &E {
        &self.event
    }

    /// Position of this event in its aggregate's lifetime, starting at 1.
    #[must_use]
    pub const fn aggregate_version(&self) -> u64 {
        self.aggregate_version
    }

    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Return a copy of this envelope with one more metadata entry.
    ///
    /// An existing entry with the same key is replaced.
    #[must_use]
    pub fn with_metadata(
        self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            metadata: self.metadata.with(key.into(), value.into()),
            ..self
        }
    }

    pub fn into_event(self) -> E {
        self.event
    }

    /// Convert the event payload, keeping every other field.
    pub fn try_map_event<T, Err>(
        self,
        f: impl FnOnce(E) -> Result<T, Err>,
    ) -> Result<EventEnvelope<T>, Err> {
        Ok(EventEnvelope {
            envelope_id: self.envelope_id,
            event_name: self.event_name,
            event: f(self.event)?,
            aggregate_version: self.aggregate_version,
            occurred_at: self.occurred_at,
            metadata: self.metadata,
        })
    }
}

/// Violation of the event stream ordering invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("aggregate versions start at 1, got 0")]
    ZeroVersion,
    #[error("expected aggregate version {expected}, got {actual}")]
    Discontinuous { expected: u64, actual: u64 },
    #[error("cannot join stream of `{other}` onto stream of `{aggregate_id}`")]
    ForeignStream { aggregate_id: String, other: String },
}

/// Ordered envelopes for exactly one aggregate.
///
/// Versions are strictly consecutive: no gaps, no duplicates. A stream may
/// start past version 1 when it holds one write batch rather than the whole
/// history.
#[derive(Debug, Clone, PartialEq)]
pub struct EventStream<E> {
    aggregate_id: String,
    envelopes: Vec<EventEnvelope<E>>,
}

impl<E> EventStream<E> {
    pub fn new(aggregate_id: impl Into<String>) -> Self {
        Self {
            aggregate_id: aggregate_id.into(),
            envelopes: Vec::new(),
        }
    }

    /// Build a stream from envelopes, validating their versions.
    pub fn from_envelopes(
        aggregate_id: impl Into<String>,
        envelopes: impl IntoIterator<Item = EventEnvelope<E>>,
    ) -> Result<Self, StreamError> {
        let mut stream = Self::new(aggregate_id);
        for envelope in envelopes {
            stream.push(envelope)?;
        }
        Ok(stream)
    }

    #[must_use]
    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    /// Append one envelope; its version must follow the last one.
    pub fn push(&mut self, envelope: EventEnvelope<E>) -> Result<(), StreamError> {
        let actual = envelope.aggregate_version;
        match self.last_version() {
            None if actual == 0 => return Err(StreamError::ZeroVersion),
            Some(last) if actual != last + 1 => {
                return Err(StreamError::Discontinuous {
                    expected: last + 1,
                    actual,
                });
            }
            _ => {}
        }
        self.envelopes.push(envelope);
        Ok(())
    }

    /// Append a later batch of the same aggregate's stream.
    ///
    /// Nothing is appended if the batch is rejected.
    pub fn extend(&mut self, batch: Self) -> Result<(), StreamError> {
        if batch.aggregate_id != self.aggregate_id {
            return Err(StreamError::ForeignStream {
                aggregate_id: self.aggregate_id.clone(),
                other: batch.aggregate_id,
            });
        }
        if let (Some(last), Some(first)) = (self.last_version(), batch.first_version())
            && first != last + 1
        {
            return Err(StreamError::Discontinuous {
                expected: last + 1,
                actual: first,
            });
        }
        if self.is_empty() && batch.first_version() == Some(0) {
            return Err(StreamError::ZeroVersion);
        }
        self.envelopes.extend(batch.envelopes);
        Ok(())
    }

    #[must_use]
    pub fn first_version(&self) -> Option<u64> {
        self.envelopes.first().map(|e| e.aggregate_version)
    }

    #[must_use]
    pub fn last_version(&self) -> Option<u64> {
        self.envelopes.last().map(|e| e.aggregate_version)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EventEnvelope<E>> {
        self.envelopes.iter()
    }

    /// Transform every envelope, e.g. to add metadata.
    ///
    /// Versions must be left untouched; [`EventEnvelope`] exposes no way to
    /// change them.
    #[must_use]
    pub fn map_envelopes(self, f: impl FnMut(EventEnvelope<E>) -> EventEnvelope<E>) -> Self {
        Self {
            aggregate_id: self.aggregate_id,
            envelopes: self.envelopes.into_iter().map(f).collect(),
        }
    }

    /// Convert the payload of every envelope, keeping order and versions.
    pub fn try_map_events<T, Err>(
        self,
        mut f: impl FnMut(E) -> Result<T, Err>,
    ) -> Result<EventStream<T>, Err> {
        let envelopes = self
            .envelopes
            .into_iter()
            .map(|envelope| envelope.try_map_event(&mut f))
            .collect::<Result<Vec<_>, Err>>()?;
        Ok(EventStream {
            aggregate_id: self.aggregate_id,
            envelopes,
        })
    }
}

impl<E> IntoIterator for EventStream<E> {
    type Item = EventEnvelope<E>;
    type IntoIter = std::vec::IntoIter<EventEnvelope<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.envelopes.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a EventStream<E> {
    type Item = &'a EventEnvelope<E>;
    type IntoIter = std::slice::Iter<'a, EventEnvelope<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.envelopes.iter()
    }
}

/// Error returned when building a history from no events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("an aggregate history must contain at least one event")]
pub struct EmptyHistory;

/// Ordered bare events of one aggregate, used for reconstruction.
///
/// Never empty: only aggregates with at least one recorded event exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateHistory<E>(NonEmpty<E>);

impl<E> AggregateHistory<E> {
    #[must_use]
    pub const fn new(events: NonEmpty<E>) -> Self {
        Self(events)
    }

    #[must_use]
    pub fn first(&self) -> &E {
        self.0.first()
    }

    /// Number of events; equal to the aggregate's committed version.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with collections.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_inner(self) -> NonEmpty<E> {
        self.0
    }
}

impl<E> TryFrom<Vec<E>> for AggregateHistory<E> {
    type Error = EmptyHistory;

    fn try_from(events: Vec<E>) -> Result<Self, Self::Error> {
        NonEmpty::from_vec(events).map(Self).ok_or(EmptyHistory)
    }
}

impl<E> IntoIterator for AggregateHistory<E> {
    type Item = E;
    type IntoIter = <NonEmpty<E> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
