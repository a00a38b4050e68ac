//! Domain event marker and the closed per-aggregate event set.
//!
//! `DomainEvent` is the lightweight trait every concrete event struct
//! implements. Events carry no identity or versioning of their own; those are
//! assigned by the event wrapper when the events are put in envelopes.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Error returned when turning a stored payload back into an event.
#[derive(Debug, Error)]
pub enum EventDecodeError {
    /// The event kind was not recognized by this event enum.
    #[error("unknown event kind `{kind}`, expected one of {expected:?}")]
    UnknownKind {
        /// The unrecognized event kind string.
        kind: String,
        /// The list of event kinds this enum can handle.
        expected: &'static [&'static str],
    },
    /// The payload did not match the shape of the event type.
    #[error("malformed payload for event kind `{kind}`: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Marker trait for domain events.
///
/// Each event carries a unique [`Self::KIND`], the event-type key handed to
/// the name resolver when the event is wrapped, and used to route stored
/// payloads back to the correct type when aggregates are rebuilt.
pub trait DomainEvent {
    const KIND: &'static str;
}

/// Extension trait for getting the event kind from an event instance.
///
/// Blanket-implemented for every [`DomainEvent`]; the derive macro implements
/// it for the generated event enums by delegating to the wrapped variant.
/// **You never need to implement this trait yourself.**
pub trait EventKind {
    fn kind(&self) -> &'static str;
}

impl<T: DomainEvent> EventKind for T {
    fn kind(&self) -> &'static str {
        T::KIND
    }
}

/// The closed set of events one aggregate understands.
///
/// Implemented by the event enum generated by `#[derive(Aggregate)]`: one
/// variant per event kind, known at build time.
pub trait AggregateEvent: EventKind + Serialize + Clone + Sized {
    /// The kinds of every variant, in declaration order.
    const EVENT_KINDS: &'static [&'static str];

    /// Rebuild the variant matching `kind` from its serialized payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventDecodeError::UnknownKind`] if no variant has this kind,
    /// or [`EventDecodeError::Payload`] if the payload is malformed.
    fn decode(kind: &str, payload: serde_json::Value) -> Result<Self, EventDecodeError>;
}

/// Deserialize one event payload.
///
/// Used by the code generated for `#[derive(Aggregate)]`.
pub fn decode_payload<E>(payload: serde_json::Value) -> Result<E, EventDecodeError>
where
    E: DomainEvent + DeserializeOwned,
{
    serde_json::from_value(payload).map_err(|source| EventDecodeError::Payload {
        kind: E::KIND.to_string(),
        source,
    })
}
