//! Aggregate identifiers and envelope id generation.
//!
//! [`Identifier`] is implemented by the opaque, string-serializable newtypes
//! that name aggregate instances. Most projects derive it with
//! `#[derive(Identifier)]`, which also generates parsing and `Display`.
//!
//! [`IdGenerator`] produces the globally unique ids stamped on every event
//! envelope.

use std::{fmt, hash::Hash};

use thiserror::Error;
use uuid::Uuid;

/// Opaque value identifying one aggregate instance.
///
/// Equality, hashing and the serialized form are all defined by the
/// underlying string. The value is assigned once, when the aggregate is
/// created, and never changes afterwards.
pub trait Identifier: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static {
    /// Identifier-type key.
    ///
    /// The aggregate factory maps this key to the aggregate kind that owns
    /// identifiers of this type. Use lowercase kebab-case: `"basket-id"`.
    const TYPE: &'static str;

    /// Serialized form of the identifier. Never empty.
    fn as_str(&self) -> &str;
}

/// Error returned when parsing an identifier from a string fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier of type `{kind}` must not be empty")]
    Empty { kind: &'static str },
}

/// Validate the raw string of an identifier.
///
/// Used by the code generated for `#[derive(Identifier)]`.
pub fn validate(kind: &'static str, raw: String) -> Result<String, IdentifierError> {
    if raw.is_empty() {
        return Err(IdentifierError::Empty { kind });
    }
    Ok(raw)
}

/// Reject an identifier whose serialized form is empty.
///
/// Identifiers built through `FromStr`/`TryFrom` are already checked; this
/// catches values constructed directly, before they reach the store.
pub fn ensure_non_empty<I: Identifier>(id: &I) -> Result<(), IdentifierError> {
    if id.as_str().is_empty() {
        return Err(IdentifierError::Empty { kind: I::TYPE });
    }
    Ok(())
}

/// Fresh identifier string for a new aggregate instance.
///
/// Time-ordered UUID v7 in its hyphenated form.
#[must_use]
pub fn generate_string() -> String {
    Uuid::now_v7().to_string()
}

/// Source of globally unique envelope ids.
///
/// The event wrapper calls [`generate`](IdGenerator::generate) exactly once
/// per envelope.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> Uuid;
}

/// Time-ordered UUID v7 ids. This is the default generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7;

impl IdGenerator for UuidV7 {
    fn generate(&self) -> Uuid {
        Uuid::now_v7()
    }
}

/// Random UUID v4 ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4;

impl IdGenerator for UuidV4 {
    fn generate(&self) -> Uuid {
        Uuid::new_v4()
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> Uuid + Send + Sync,
{
    fn generate(&self) -> Uuid {
        self()
    }
}
