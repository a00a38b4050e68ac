//! Event store contract.
//!
//! The store is an external collaborator: a durable, append-only log of event
//! streams, one per aggregate instance. This module describes what the
//! repository requires of it and provides an in-memory reference
//! implementation in [`inmemory`].
use std::future::Future;

use thiserror::Error;

use crate::{concurrency::ConcurrencyConflict, envelope::EventStream};

pub mod inmemory;

/// Event stream as it crosses the store boundary: payloads are serialized,
/// every other envelope field is kept as is.
pub type RawEventStream = EventStream<serde_json::Value>;

/// Identifies one aggregate instance's stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub aggregate_kind: String,
    pub aggregate_id: String,
}

impl StreamKey {
    pub fn new(aggregate_kind: impl Into<String>, aggregate_id: impl Into<String>) -> Self {
        Self {
            aggregate_kind: aggregate_kind.into(),
            aggregate_id: aggregate_id.into(),
        }
    }
}

/// Error from append operations with version checking.
#[derive(Debug, Error)]
pub enum AppendError<StoreError>
where
    StoreError: std::error::Error,
{
    /// Attempted to append a stream with no envelopes.
    #[error("cannot append an empty event stream")]
    EmptyAppend,
    /// Concurrency conflict - another writer modified the stream.
    #[error(transparent)]
    Conflict(#[from] ConcurrencyConflict),
    /// Underlying store error.
    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl<StoreError: std::error::Error> AppendError<StoreError> {
    /// Create a store error variant.
    pub const fn store(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Abstraction over the persistence layer for event streams.
///
/// Implementations must guarantee that:
///
/// - streams are durable once an append is acknowledged;
/// - reads observe every previously acknowledged append for the same stream;
/// - the expected-version check is atomic with the append.
// ANCHOR: event_store_trait
pub trait EventStore: Send + Sync {
    /// Store-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append a batch to the stream named by `aggregate_kind` and the batch's
    /// aggregate id.
    ///
    /// `expected_version` is the version the batch was built on (0 for a new
    /// aggregate). The batch's first envelope must carry
    /// `expected_version + 1`.
    ///
    /// # Errors
    ///
    /// - [`AppendError::EmptyAppend`] if the batch has no envelopes.
    /// - [`AppendError::Conflict`] if the stored version is not
    ///   `expected_version`.
    /// - [`AppendError::Store`] if persistence fails.
    fn append<'a>(
        &'a self,
        aggregate_kind: &'a str,
        expected_version: u64,
        stream: RawEventStream,
    ) -> impl Future<Output = Result<(), AppendError<Self::Error>>> + Send + 'a;

    /// Read the whole stream of an aggregate, `None` if it has none.
    ///
    /// # Errors
    ///
    /// Returns a store-specific error when loading fails.
    fn read<'a>(
        &'a self,
        aggregate_kind: &'a str,
        aggregate_id: &'a str,
    ) -> impl Future<Output = Result<Option<RawEventStream>, Self::Error>> + Send + 'a;

    /// Number of events stored for an aggregate, `None` if it has no stream.
    ///
    /// Reads the whole stream by default; stores that track the version
    /// separately should override it.
    ///
    /// # Errors
    ///
    /// Returns a store-specific error when the operation fails.
    fn stream_version<'a>(
        &'a self,
        aggregate_kind: &'a str,
        aggregate_id: &'a str,
    ) -> impl Future<Output = Result<Option<u64>, Self::Error>> + Send + 'a {
        let stream = self.read(aggregate_kind, aggregate_id);
        async move {
            Ok(stream
                .await?
                .as_ref()
                .and_then(RawEventStream::last_version))
        }
    }
}
// ANCHOR_END: event_store_trait
