//! In-memory event store implementation for testing.
//!
//! This module provides [`Store`], a thread-safe in-memory implementation of
//! [`EventStore`](super::EventStore) suitable for unit tests and examples.
//! Clones share the same streams.
//!
//! # Example
//!
//! ```
//! use rehydrate_core::store::inmemory;
//!
//! let store = inmemory::Store::new();
//! assert_eq!(store.stream_count(), 0);
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{
    concurrency::ConcurrencyConflict,
    envelope::StreamError,
    store::{AppendError, EventStore, RawEventStream, StreamKey},
};

/// In-memory event store that keeps streams in a hash map.
#[derive(Clone, Default)]
pub struct Store {
    streams: Arc<RwLock<HashMap<StreamKey, RawEventStream>>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("streams", &self.stream_count())
            .finish()
    }
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of aggregate streams held. A poisoned lock counts as empty.
    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.streams.read().map_or(0, |streams| streams.len())
    }
}

/// Error type for in-memory store.
#[derive(Debug, thiserror::Error)]
pub enum InMemoryError {
    #[error("in-memory store lock poisoned")]
    LockPoisoned,
    #[error("appended batch does not continue the stored stream: {0}")]
    Stream(#[source] StreamError),
}

impl EventStore for Store {
    type Error = InMemoryError;

    #[tracing::instrument(skip(self))]
    fn stream_version<'a>(
        &'a self,
        aggregate_kind: &'a str,
        aggregate_id: &'a str,
    ) -> impl Future<Output = Result<Option<u64>, Self::Error>> + Send + 'a {
        let key = StreamKey::new(aggregate_kind, aggregate_id);
        let version = self
            .streams
            .read()
            .map(|streams| streams.get(&key).and_then(RawEventStream::last_version))
            .map_err(|_| InMemoryError::LockPoisoned);
        tracing::trace!(?version, "retrieved stream version");
        std::future::ready(version)
    }

    #[tracing::instrument(
        skip(self, stream),
        fields(aggregate_id = %stream.aggregate_id(), event_count = stream.len())
    )]
    fn append<'a>(
        &'a self,
        aggregate_kind: &'a str,
        expected_version: u64,
        stream: RawEventStream,
    ) -> impl Future<Output = Result<(), AppendError<Self::Error>>> + Send + 'a {
        let result = (|| -> Result<(), AppendError<InMemoryError>> {
            if stream.is_empty() {
                return Err(AppendError::EmptyAppend);
            }
            let key = StreamKey::new(aggregate_kind, stream.aggregate_id());
            let mut streams = self
                .streams
                .write()
                .map_err(|_| AppendError::store(InMemoryError::LockPoisoned))?;

            let actual = streams
                .get(&key)
                .and_then(RawEventStream::last_version)
                .unwrap_or(0);
            if actual != expected_version {
                tracing::debug!(expected_version, actual, "version mismatch, rejecting append");
                return Err(ConcurrencyConflict {
                    aggregate_id: key.aggregate_id,
                    expected: expected_version,
                    actual,
                }
                .into());
            }

            let event_count = stream.len();
            match streams.get_mut(&key) {
                Some(stored) => stored
                    .extend(stream)
                    .map_err(|e| AppendError::store(InMemoryError::Stream(e)))?,
                None => {
                    if stream.first_version() != Some(1) {
                        return Err(AppendError::store(InMemoryError::Stream(
                            StreamError::Discontinuous {
                                expected: 1,
                                actual: stream.first_version().unwrap_or(0),
                            },
                        )));
                    }
                    streams.insert(key, stream);
                }
            }
            drop(streams);
            tracing::debug!(events_appended = event_count, "events appended to stream");
            Ok(())
        })();

        std::future::ready(result)
    }

    #[tracing::instrument(skip(self))]
    fn read<'a>(
        &'a self,
        aggregate_kind: &'a str,
        aggregate_id: &'a str,
    ) -> impl Future<Output = Result<Option<RawEventStream>, Self::Error>> + Send + 'a {
        let key = StreamKey::new(aggregate_kind, aggregate_id);
        let stream = self
            .streams
            .read()
            .map(|streams| streams.get(&key).cloned())
            .map_err(|_| InMemoryError::LockPoisoned);
        if let Ok(stream) = &stream {
            tracing::trace!(
                found = stream.is_some(),
                event_count = stream.as_ref().map_or(0, RawEventStream::len),
                "read stream"
            );
        }
        std::future::ready(stream)
    }
}
