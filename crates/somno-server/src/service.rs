//! Record service: orchestrates validation, persistence, and aggregation.
//!
//! The store is injected rather than reached through a global, and writers
//! hold the store lock across the whole read-validate-write sequence, so an
//! overlap check can never race a concurrent insert on the same store.

use chrono::Utc;
use serde::Deserialize;
use somno_core::{DailyStat, HourBucket, SleepDraft, SleepRecord, WeeklyStat};
use somno_db::Database;
use tokio::sync::Mutex;

use crate::error::ApiError;

/// Raw interval submission from a client.
///
/// Timestamps stay strings here; parsing them is the first validation step.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepInput {
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Shared application state behind every handler.
pub struct RecordService {
    db: Mutex<Database>,
    advice: Option<somno_llm::Client>,
    advice_model: String,
}

impl RecordService {
    pub fn new(db: Database, advice: Option<somno_llm::Client>, advice_model: String) -> Self {
        Self {
            db: Mutex::new(db),
            advice,
            advice_model,
        }
    }

    /// Validates and persists a new sleep interval.
    pub async fn create_record(&self, input: SleepInput) -> Result<SleepRecord, ApiError> {
        let db = self.db.lock().await;
        let existing = db.list()?;
        let (start_time, end_time) = somno_core::validate_interval(
            &input.start_time,
            &input.end_time,
            Utc::now(),
            &existing,
            None,
        )?;
        let draft = SleepDraft {
            start_time,
            end_time,
            note: input.note,
        };
        Ok(db.create(&draft)?)
    }

    /// All records, most recent `start_time` first.
    pub async fn list_records(&self) -> Result<Vec<SleepRecord>, ApiError> {
        Ok(self.db.lock().await.list()?)
    }

    /// Validates and replaces an existing record, excluding it from its own
    /// overlap check.
    pub async fn update_record(&self, id: i64, input: SleepInput) -> Result<SleepRecord, ApiError> {
        let db = self.db.lock().await;
        let existing = db.list()?;
        let (start_time, end_time) = somno_core::validate_interval(
            &input.start_time,
            &input.end_time,
            Utc::now(),
            &existing,
            Some(id),
        )?;
        let draft = SleepDraft {
            start_time,
            end_time,
            note: input.note,
        };
        Ok(db.update(id, &draft)?)
    }

    /// Hard-deletes a record.
    pub async fn delete_record(&self, id: i64) -> Result<(), ApiError> {
        Ok(self.db.lock().await.delete(id)?)
    }

    /// Daily averages over the trailing week, recomputed from the store.
    pub async fn daily_stats(&self) -> Result<Vec<DailyStat>, ApiError> {
        let records = self.db.lock().await.list()?;
        Ok(somno_core::daily_stats(&records, Utc::now()))
    }

    /// Sunday-anchored weekly totals over all records.
    pub async fn weekly_stats(&self) -> Result<Vec<WeeklyStat>, ApiError> {
        let records = self.db.lock().await.list()?;
        Ok(somno_core::weekly_stats(&records))
    }

    /// Start/end counts per local hour of day.
    pub async fn hour_distribution(&self) -> Result<Vec<HourBucket>, ApiError> {
        let records = self.db.lock().await.list()?;
        Ok(somno_core::hour_distribution(&records))
    }

    /// Forwards the caller-supplied payload to the advice provider.
    ///
    /// Runs without the store lock, so a slow provider never blocks CRUD.
    pub async fn advice(&self, payload: &somno_llm::AdvicePayload) -> Result<String, ApiError> {
        let client = self.advice.as_ref().ok_or(ApiError::AdviceNotConfigured)?;
        Ok(client.advice(&self.advice_model, payload).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SecondsFormat};
    use somno_core::ValidationError;

    fn service() -> RecordService {
        let db = Database::open_in_memory().expect("open in-memory db");
        RecordService::new(db, None, "test-model".to_string())
    }

    /// An interval ending `hours_ago` hours before now, of the given length.
    fn recent_input(hours_ago: i64, length_hours: i64, note: Option<&str>) -> SleepInput {
        let end = Utc::now() - Duration::hours(hours_ago);
        let start = end - Duration::hours(length_hours);
        SleepInput {
            start_time: start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end_time: end.to_rfc3339_opts(SecondsFormat::Secs, true),
            note: note.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn created_record_appears_in_listing() {
        let service = service();
        let created = service
            .create_record(recent_input(1, 8, Some("deep sleep")))
            .await
            .expect("create record");

        let records = service.list_records().await.expect("list records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, created.id);
        assert_eq!(records[0].note.as_deref(), Some("deep sleep"));
    }

    #[tokio::test]
    async fn overlapping_create_is_rejected() {
        let service = service();
        service
            .create_record(recent_input(1, 8, None))
            .await
            .expect("create first");

        // Same window shifted by an hour still intersects.
        let err = service
            .create_record(recent_input(2, 8, None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::OverlapViolation { .. })
        ));
    }

    #[tokio::test]
    async fn update_to_own_interval_succeeds() {
        let service = service();
        let created = service
            .create_record(recent_input(1, 8, None))
            .await
            .expect("create record");

        let updated = service
            .update_record(
                created.id,
                SleepInput {
                    start_time: created.start_time.to_rfc3339(),
                    end_time: created.end_time.to_rfc3339(),
                    note: Some("unchanged interval".to_string()),
                },
            )
            .await
            .expect("update record");
        assert_eq!(updated.note.as_deref(), Some("unchanged interval"));
    }

    #[tokio::test]
    async fn update_missing_record_is_not_found() {
        let service = service();
        let err = service
            .update_record(99, recent_input(1, 8, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(99)));
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let service = service();
        let created = service
            .create_record(recent_input(1, 8, None))
            .await
            .expect("create record");

        service.delete_record(created.id).await.expect("delete");
        let err = service.delete_record(created.id).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn stats_reflect_current_store_contents() {
        let service = service();
        service
            .create_record(recent_input(1, 8, None))
            .await
            .expect("create record");

        let daily = service.daily_stats().await.expect("daily stats");
        assert_eq!(daily.iter().map(|d| d.sleep_count).sum::<usize>(), 1);

        let weekly = service.weekly_stats().await.expect("weekly stats");
        assert!(!weekly.is_empty());

        let hours = service.hour_distribution().await.expect("hour stats");
        assert_eq!(hours.len(), 24);
        assert_eq!(hours.iter().map(|b| b.starts).sum::<u64>(), 1);
    }

    #[tokio::test]
    async fn advice_without_credential_is_a_configuration_error() {
        let service = service();
        let payload = somno_llm::AdvicePayload {
            sleeps: serde_json::json!([]),
            sleep_stats: serde_json::json!([]),
            weekly_sleep_stats: serde_json::json!([]),
            hour_distribution_stats: serde_json::json!([]),
        };
        let err = service.advice(&payload).await.unwrap_err();
        assert!(matches!(err, ApiError::AdviceNotConfigured));
    }
}
