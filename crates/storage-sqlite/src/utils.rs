//! Helpers shared by the repositories.

use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;

/// Maximum number of ids bound into one `IN (...)` clause.
///
/// SQLite caps the number of parameters per statement, so long id lists are
/// queried in slices of this size.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Fixed-width RFC 3339 text with microseconds, so that stored timestamps
/// sort lexicographically in chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Invalid stored timestamp '{}': {}", raw, e);
            Utc::now()
        })
}

/// Drops sub-microsecond precision, matching what is stored.
pub fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts.timestamp_micros()).unwrap_or(ts)
}
