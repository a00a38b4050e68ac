//! Conversion between recorded events and event streams.
//!
//! [`EventWrapper::wrap`] puts freshly recorded events in envelopes: a new
//! envelope id, the resolved event name, the next aggregate version and the
//! current time. [`EventWrapper::unwrap`] strips envelopes back off to obtain
//! the aggregate history. [`EventWrapper::decode`] sits between the two on
//! the read path, turning stored payloads back into the aggregate's events.

use std::sync::Arc;

use chrono::Utc;
use nonempty::NonEmpty;
use thiserror::Error;

use crate::{
    aggregate::UnhandledEventError,
    envelope::{AggregateHistory, EventEnvelope, EventStream, Metadata},
    event::{AggregateEvent, EventDecodeError, EventKind},
    id::{IdGenerator, Identifier, UuidV7},
    naming::{EventNameResolver, KindNames, NameResolutionError},
};

/// Unwrap was called on a stream with no envelopes.
///
/// Stores never hold empty streams, so this indicates a store invariant
/// violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event stream for `{aggregate_id}` is empty")]
pub struct EmptyStreamError {
    pub aggregate_id: String,
}

/// Error returned when decoding a stored stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Unhandled(#[from] UnhandledEventError),
    #[error("failed to decode event at version {version}: {source}")]
    Payload {
        version: u64,
        #[source]
        source: EventDecodeError,
    },
}

/// Puts events in envelopes and takes them back out.
#[derive(Clone)]
pub struct EventWrapper {
    ids: Arc<dyn IdGenerator>,
    names: Arc<dyn EventNameResolver>,
}

impl Default for EventWrapper {
    fn default() -> Self {
        Self::new(UuidV7, KindNames)
    }
}

impl std::fmt::Debug for EventWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventWrapper").finish_non_exhaustive()
    }
}

impl EventWrapper {
    pub fn new(
        ids: impl IdGenerator + 'static,
        names: impl EventNameResolver + 'static,
    ) -> Self {
        Self {
            ids: Arc::new(ids),
            names: Arc::new(names),
        }
    }

    /// Wrap recorded events into a stream continuing from `base_version`.
    ///
    /// The envelopes get versions `base_version + 1 ..= base_version + n`,
    /// in recording order, and empty metadata. Each envelope is stamped with
    /// the clock reading taken when it is built.
    ///
    /// # Errors
    ///
    /// Returns [`NameResolutionError`] if any event kind has no name. No
    /// stream is produced in that case.
    pub fn wrap<E, I>(
        &self,
        events: NonEmpty<E>,
        aggregate_id: &I,
        base_version: u64,
    ) -> Result<EventStream<E>, NameResolutionError>
    where
        E: EventKind,
        I: Identifier,
    {
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = base_version;
        for event in events {
            let event_name = self.names.resolve(event.kind())?;
            version += 1;
            tracing::trace!(%event_name, version, "wrapping event");
            envelopes.push(EventEnvelope::from_parts(
                self.ids.generate(),
                event_name,
                event,
                version,
                Utc::now(),
                Metadata::default(),
            ));
        }
        match EventStream::from_envelopes(aggregate_id.as_str(), envelopes) {
            Ok(stream) => Ok(stream),
            Err(err) => unreachable!("wrapped versions are consecutive: {err}"),
        }
    }

    /// Strip the envelopes off a stream, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyStreamError`] if the stream has no envelopes.
    pub fn unwrap<E>(&self, stream: EventStream<E>) -> Result<AggregateHistory<E>, EmptyStreamError> {
        let aggregate_id = stream.aggregate_id().to_string();
        let events: Vec<E> = stream.into_iter().map(EventEnvelope::into_event).collect();
        AggregateHistory::try_from(events).map_err(|_| EmptyStreamError { aggregate_id })
    }

    /// Turn stored payloads back into the aggregate's events.
    ///
    /// Each envelope's name is mapped back to one of the kinds the event enum
    /// declares, using the same resolver that named it.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Unhandled`] if a name matches none of the
    /// aggregate's kinds, or [`DecodeError::Payload`] if a payload is
    /// malformed.
    pub fn decode<E>(
        &self,
        aggregate_kind: &'static str,
        stream: EventStream<serde_json::Value>,
    ) -> Result<EventStream<E>, DecodeError>
    where
        E: AggregateEvent,
    {
        let mut decoded = EventStream::new(stream.aggregate_id());
        for envelope in stream {
            let Some(kind) = self.names.kind_of(envelope.event_name(), E::EVENT_KINDS) else {
                return Err(UnhandledEventError::UnknownEvent {
                    aggregate_kind,
                    event_name: envelope.event_name().to_string(),
                }
                .into());
            };
            let version = envelope.aggregate_version();
            let envelope = envelope
                .try_map_event(|payload| E::decode(kind, payload))
                .map_err(|source| DecodeError::Payload { version, source })?;
            match decoded.push(envelope) {
                Ok(()) => {}
                Err(err) => unreachable!("decoding preserves stream order: {err}"),
            }
        }
        Ok(decoded)
    }
}
