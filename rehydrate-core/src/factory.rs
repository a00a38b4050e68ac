//! Aggregate factory: identifier type → aggregate kind.
//!
//! Which aggregate owns a given identifier type is static configuration. The
//! mapping can be loaded from TOML:
//!
//! ```toml
//! [aggregates]
//! basket-id = "basket"
//! order-id = "order"
//! ```
//!
//! or assembled in code with [`AggregateFactory::register`].

use std::{collections::HashMap, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    aggregate::{Aggregate, UnhandledEventError},
    envelope::AggregateHistory,
    id::Identifier,
};

/// Error returned when reconstituting an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// No aggregate kind is configured for the identifier type.
    #[error("no aggregate type is mapped to identifier type `{id_type}`")]
    UnknownAggregateType { id_type: String },
    /// The identifier type is mapped to a different aggregate kind.
    #[error(
        "identifier type `{id_type}` is mapped to aggregate `{configured}`, not `{requested}`"
    )]
    KindMismatch {
        id_type: String,
        configured: String,
        requested: &'static str,
    },
    #[error(transparent)]
    Unhandled(#[from] UnhandledEventError),
}

/// Error returned when loading an [`AggregateTypeMap`].
#[derive(Debug, Error)]
#[error("failed to load aggregate type map: {source}")]
pub struct ConfigError {
    #[from]
    source: config::ConfigError,
}

/// Identifier-type key → aggregate-kind key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AggregateTypeMap {
    #[serde(default)]
    aggregates: HashMap<String, String>,
}

impl AggregateTypeMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a mapping from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is not valid TOML or does not
    /// have the expected shape.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let map = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(map)
    }

    /// Load a mapping from a configuration file. The format is picked from
    /// the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let map = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        Ok(map)
    }

    /// Map an identifier type to an aggregate kind, replacing any previous
    /// entry.
    #[must_use]
    pub fn with(mut self, id_type: impl Into<String>, aggregate_kind: impl Into<String>) -> Self {
        self.aggregates.insert(id_type.into(), aggregate_kind.into());
        self
    }

    #[must_use]
    pub fn aggregate_kind_for(&self, id_type: &str) -> Option<&str> {
        self.aggregates.get(id_type).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }
}

/// Rebuilds aggregates from their history.
#[derive(Debug, Clone, Default)]
pub struct AggregateFactory {
    types: AggregateTypeMap,
}

impl AggregateFactory {
    #[must_use]
    pub const fn new(types: AggregateTypeMap) -> Self {
        Self { types }
    }

    /// Map `A`'s identifier type to `A`.
    #[must_use]
    pub fn register<A: Aggregate>(self) -> Self {
        Self {
            types: self.types.with(<A::Id as Identifier>::TYPE, A::KIND),
        }
    }

    #[must_use]
    pub fn aggregate_kind_for(&self, id_type: &str) -> Option<&str> {
        self.types.aggregate_kind_for(id_type)
    }

    #[must_use]
    pub const fn types(&self) -> &AggregateTypeMap {
        &self.types
    }

    /// Reconstitute an aggregate selected by its identifier type.
    ///
    /// # Errors
    ///
    /// - [`FactoryError::UnknownAggregateType`] if nothing is mapped to
    ///   `A::Id`'s type.
    /// - [`FactoryError::KindMismatch`] if the mapping names another
    ///   aggregate.
    /// - [`FactoryError::Unhandled`] if [`Aggregate::from_history`] fails.
    pub fn reconstitute<A: Aggregate>(
        &self,
        history: AggregateHistory<A::Event>,
    ) -> Result<A, FactoryError> {
        let id_type = <A::Id as Identifier>::TYPE;
        let configured = self.types.aggregate_kind_for(id_type).ok_or_else(|| {
            FactoryError::UnknownAggregateType {
                id_type: id_type.to_string(),
            }
        })?;
        if configured != A::KIND {
            return Err(FactoryError::KindMismatch {
                id_type: id_type.to_string(),
                configured: configured.to_string(),
                requested: A::KIND,
            });
        }
        Ok(A::from_history(history)?)
    }
}
