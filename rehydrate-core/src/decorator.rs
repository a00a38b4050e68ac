//! Envelope enrichment between wrapping and persistence.
//!
//! Decorators run on every envelope of a write batch after the wrapper has
//! produced it and before the store sees it. They can only add metadata:
//! [`EventEnvelope::with_metadata`] is the one mutation an envelope allows.

use serde_json::Value;

use crate::envelope::EventEnvelope;

/// Adds metadata to outgoing envelopes.
///
/// Implemented for closures:
///
/// ```
/// use rehydrate_core::{decorator::EnvelopeDecorator, envelope::EventEnvelope};
///
/// let tenant = |envelope: EventEnvelope<serde_json::Value>| envelope.with_metadata("tenant", "acme");
/// # fn accepts(_: impl EnvelopeDecorator) {}
/// # accepts(tenant);
/// ```
pub trait EnvelopeDecorator: Send + Sync {
    fn decorate(&self, envelope: EventEnvelope<Value>) -> EventEnvelope<Value>;
}

impl<F> EnvelopeDecorator for F
where
    F: Fn(EventEnvelope<Value>) -> EventEnvelope<Value> + Send + Sync,
{
    fn decorate(&self, envelope: EventEnvelope<Value>) -> EventEnvelope<Value> {
        self(envelope)
    }
}

/// Stamps the same key/value pairs on every envelope.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    entries: Vec<(String, Value)>,
}

impl StaticMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }
}

impl EnvelopeDecorator for StaticMetadata {
    fn decorate(&self, envelope: EventEnvelope<Value>) -> EventEnvelope<Value> {
        self.entries
            .iter()
            .fold(envelope, |envelope, (key, value)| {
                envelope.with_metadata(key.clone(), value.clone())
            })
    }
}
