//! Core domain logic for the sleep tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Sleep records: validated intervals with an optional note
//! - Validation: ordering, future-time, and overlap checks
//! - Statistics: daily averages, weekly totals, hour-of-day distribution

pub mod record;
pub mod stats;
pub mod validate;

pub use record::{SleepDraft, SleepRecord};
pub use stats::{DailyStat, HourBucket, WeeklyStat, daily_stats, hour_distribution, weekly_stats};
pub use validate::{ValidationError, overlaps, parse_timestamp, validate_interval};
