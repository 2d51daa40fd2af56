//! Business-rule validation for candidate sleep intervals.
//!
//! Checks run in a fixed order and fail fast: timestamp format, ordering,
//! future-time, then overlap against existing records. The first failing
//! check is the error the caller sees.

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;

use crate::record::SleepRecord;

/// Rejection reasons for a candidate interval.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A timestamp could not be parsed as RFC 3339.
    #[error("invalid timestamp {value:?}: {source}")]
    InvalidTimeFormat {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The interval does not run forward in time.
    #[error("start time must be strictly before end time")]
    OrderingViolation,

    /// One of the timestamps lies in the future.
    #[error("sleep intervals cannot extend into the future")]
    FutureTimeViolation,

    /// The interval intersects an already-recorded one.
    #[error("interval overlaps existing sleep record {id}")]
    OverlapViolation { id: i64 },
}

/// Parses an RFC 3339 timestamp, keeping its offset.
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, ValidationError> {
    DateTime::parse_from_rfc3339(value).map_err(|source| ValidationError::InvalidTimeFormat {
        value: value.to_string(),
        source,
    })
}

/// Half-open interval intersection: `[s1, e1)` and `[s2, e2)` overlap iff
/// `s1 < e2 && s2 < e1`. Covers containment, partial overlap, and exact
/// match in either direction; touching endpoints do not overlap.
pub fn overlaps(
    s1: DateTime<FixedOffset>,
    e1: DateTime<FixedOffset>,
    s2: DateTime<FixedOffset>,
    e2: DateTime<FixedOffset>,
) -> bool {
    s1 < e2 && s2 < e1
}

/// Validates a candidate interval against the full rule set.
///
/// `now` is injected so callers (and tests) control the future-time boundary.
/// For updates, `exclude_id` removes the record being replaced from the
/// overlap scan so a record may keep its own interval.
///
/// Returns the parsed endpoints on success.
pub fn validate_interval(
    start: &str,
    end: &str,
    now: DateTime<Utc>,
    existing: &[SleepRecord],
    exclude_id: Option<i64>,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), ValidationError> {
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;

    if start >= end {
        return Err(ValidationError::OrderingViolation);
    }
    if start > now || end > now {
        return Err(ValidationError::FutureTimeViolation);
    }
    for record in existing {
        if exclude_id == Some(record.id) {
            continue;
        }
        if overlaps(record.start_time, record.end_time, start, end) {
            return Err(ValidationError::OverlapViolation { id: record.id });
        }
    }

    Ok((start, end))
}
