//! Aggregate statistics derived from the full record set.
//!
//! All three transforms are stateless: they take a slice of records and
//! recompute from scratch. Calendar dates and hour buckets are taken from
//! each record's stored offset, so grouping follows the sleeper's local
//! clock rather than UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use serde::Serialize;

use crate::record::SleepRecord;

/// Days of history considered by [`daily_stats`].
const DAILY_LOOKBACK_DAYS: i64 = 7;

/// Per-date average over the trailing lookback window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: NaiveDate,
    pub average_duration: f64,
    pub sleep_count: usize,
}

/// Total sleep per Sunday-anchored week, over all records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStat {
    /// Date of the Sunday starting the week.
    pub week: NaiveDate,
    pub total_duration: f64,
}

/// Start/end counts for one local hour of day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourBucket {
    /// Two-digit hour label, `"00"` through `"23"`.
    pub hour: String,
    pub starts: u64,
    pub ends: u64,
}

/// Groups records from the last seven days by local calendar date and
/// averages their durations. One entry per distinct date, ascending.
#[allow(clippy::cast_precision_loss)]
pub fn daily_stats(records: &[SleepRecord], now: DateTime<Utc>) -> Vec<DailyStat> {
    let cutoff = now - Duration::days(DAILY_LOOKBACK_DAYS);

    let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for record in records {
        if record.start_time < cutoff {
            continue;
        }
        let entry = by_date.entry(record.start_time.date_naive()).or_default();
        entry.0 += record.duration_hours();
        entry.1 += 1;
    }

    by_date
        .into_iter()
        .map(|(date, (total, count))| DailyStat {
            date,
            average_duration: total / count as f64,
            sleep_count: count,
        })
        .collect()
}

/// Sums durations per Sunday-anchored week across all records, ascending by
/// week start.
pub fn weekly_stats(records: &[SleepRecord]) -> Vec<WeeklyStat> {
    let mut by_week: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        let week = week_start(record.start_time.date_naive());
        *by_week.entry(week).or_default() += record.duration_hours();
    }

    by_week
        .into_iter()
        .map(|(week, total_duration)| WeeklyStat {
            week,
            total_duration,
        })
        .collect()
}

/// Counts record starts and ends per local hour of day.
///
/// Always emits exactly 24 buckets, `"00"` through `"23"`, zero counts
/// included.
pub fn hour_distribution(records: &[SleepRecord]) -> Vec<HourBucket> {
    let mut starts = [0u64; 24];
    let mut ends = [0u64; 24];
    for record in records {
        starts[record.start_time.hour() as usize] += 1;
        ends[record.end_time.hour() as usize] += 1;
    }

    (0..24)
        .map(|hour| HourBucket {
            hour: format!("{hour:02}"),
            starts: starts[hour],
            ends: ends[hour],
        })
        .collect()
}

/// The most recent Sunday at or before the given date.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}
