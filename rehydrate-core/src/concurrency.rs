//! Optimistic concurrency.
//!
//! Every append carries the version the writer believes is stored. The store
//! compares it with the actual stored version atomically with the append and
//! reports a [`ConcurrencyConflict`] when they differ. Conflicts are never
//! retried by this crate.

use thiserror::Error;

/// Another writer persisted events for the aggregate since it was loaded.
///
/// Versions count stored events, so `0` means "no stream yet".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", format_conflict(.aggregate_id, *.expected, *.actual))]
pub struct ConcurrencyConflict {
    pub aggregate_id: String,
    /// The version the writer based its events on.
    pub expected: u64,
    /// The version actually stored.
    pub actual: u64,
}

/// Build a human-readable message for a [`ConcurrencyConflict`], including an
/// actionable hint for the caller.
fn format_conflict(aggregate_id: &str, expected: u64, actual: u64) -> String {
    if expected == 0 {
        format!(
            "concurrency conflict on `{aggregate_id}`: expected new stream, found version \
             {actual} (hint: another process created this aggregate; reload and retry)"
        )
    } else {
        format!(
            "concurrency conflict on `{aggregate_id}`: expected version {expected}, found \
             {actual} (hint: stream was modified; reload and retry)"
        )
    }
}
