//! Sleep interval records.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// A persisted sleep interval.
///
/// Timestamps keep the offset they were submitted with so that calendar
/// grouping and hour bucketing reflect the sleeper's local clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRecord {
    /// Store-assigned identifier, immutable once created.
    pub id: i64,
    /// When the sleep interval began. Always strictly before `end_time`.
    pub start_time: DateTime<FixedOffset>,
    /// When the sleep interval ended.
    pub end_time: DateTime<FixedOffset>,
    /// Optional free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Set by the store on insert.
    pub created_at: DateTime<Utc>,
    /// Refreshed by the store on every update.
    pub updated_at: DateTime<Utc>,
}

impl SleepRecord {
    /// Interval length in fractional hours.
    ///
    /// Computed as whole milliseconds divided by 3 600 000; rounding is left
    /// to the presentation layer.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_hours(&self) -> f64 {
        let millis = self
            .end_time
            .signed_duration_since(self.start_time)
            .num_milliseconds();
        millis as f64 / MILLIS_PER_HOUR
    }
}

/// A validated interval ready to be persisted.
///
/// Produced by [`crate::validate::validate_interval`]; the store assigns the
/// id and audit timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct SleepDraft {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(start: &str, end: &str) -> SleepRecord {
        SleepRecord {
            id: 1,
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "exact millisecond arithmetic")]
    fn duration_hours_retains_fraction() {
        let r = record("2024-01-01T22:00:00+00:00", "2024-01-02T06:30:00+00:00");
        assert_eq!(r.duration_hours(), 8.5);
    }

    #[test]
    fn duration_hours_respects_offsets() {
        // 22:00+09:00 is 13:00Z; ending 21:00Z gives eight hours.
        let r = record("2024-01-01T22:00:00+09:00", "2024-01-01T21:00:00+00:00");
        assert!((r.duration_hours() - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn record_serializes_camel_case() {
        let r = record("2024-01-01T22:00:00+00:00", "2024-01-02T06:00:00+00:00");
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("startTime").is_some());
        assert!(json.get("endTime").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        // Absent note is omitted entirely.
        assert!(json.get("note").is_none());
    }

    #[test]
    fn record_roundtrips_through_json() {
        let mut r = record("2024-01-01T22:00:00+09:00", "2024-01-02T06:00:00+09:00");
        r.note = Some("restless".to_string());
        let json = serde_json::to_string(&r).unwrap();
        let parsed: SleepRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, r);
    }
}
