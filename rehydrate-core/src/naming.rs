//! Event-name resolution.
//!
//! The wrapper asks an [`EventNameResolver`] for the name stamped on each
//! envelope. Resolution must be deterministic and injective over the kinds an
//! aggregate declares, so that a stored name can be mapped back to its kind
//! when the aggregate is rebuilt.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

/// The resolver has no name for an event kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no event name registered for event kind `{kind}`")]
pub struct NameResolutionError {
    pub kind: String,
}

/// Maps an event-type key ([`DomainEvent::KIND`](crate::event::DomainEvent))
/// to the name persisted in the envelope.
pub trait EventNameResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns [`NameResolutionError`] if the kind cannot be named.
    fn resolve(&self, kind: &str) -> Result<String, NameResolutionError>;

    /// Reverse lookup of a stored name among a set of candidate kinds.
    fn kind_of(&self, name: &str, candidates: &'static [&'static str]) -> Option<&'static str> {
        candidates
            .iter()
            .copied()
            .find(|kind| self.resolve(kind).is_ok_and(|resolved| resolved == name))
    }
}

/// Uses each event's declared kind as its name. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct KindNames;

impl EventNameResolver for KindNames {
    fn resolve(&self, kind: &str) -> Result<String, NameResolutionError> {
        Ok(kind.to_string())
    }
}

/// Explicit kind → name table.
///
/// Strict: kinds missing from the table fail to resolve. Deserializes from a
/// plain map, so the table can live in configuration:
///
/// ```toml
/// item-added = "basket.item_added"
/// item-removed = "basket.item_removed"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct NameRegistry {
    names: HashMap<String, String>,
}

impl NameRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the name for one kind, replacing any previous entry.
    #[must_use]
    pub fn with(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.names.insert(kind.into(), name.into());
        self
    }
}

impl EventNameResolver for NameRegistry {
    fn resolve(&self, kind: &str) -> Result<String, NameResolutionError> {
        self.names
            .get(kind)
            .cloned()
            .ok_or_else(|| NameResolutionError {
                kind: kind.to_string(),
            })
    }
}
