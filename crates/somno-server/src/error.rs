//! HTTP error mapping.
//!
//! One type collects every failure a handler can produce and maps it to a
//! status code plus a `{"error": "..."}` body. Validation problems are
//! deterministic rejections (400); storage and upstream provider failures
//! surface as 500 and are never retried here.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use somno_core::ValidationError;
use somno_db::StoreError;
use somno_llm::AdviceError;
use thiserror::Error;

/// Failures surfaced to API callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A candidate interval broke a business rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A request body did not match the expected shape.
    #[error("invalid request body: {0}")]
    Body(String),

    /// The referenced record does not exist.
    #[error("sleep record {0} not found")]
    NotFound(i64),

    /// The store failed; details go to the log, not the caller.
    #[error("storage failure")]
    Storage(#[source] StoreError),

    /// No advice credential is configured.
    #[error("advice provider credential is not configured")]
    AdviceNotConfigured,

    /// The advice provider call failed.
    #[error("advice request failed: {0}")]
    Advice(#[from] AdviceError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::AdviceNotConfigured | Self::Advice(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Storage(source) = &self {
            tracing::error!(error = %source, "storage failure");
        }
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_request() {
        let err = ApiError::from(ValidationError::OrderingViolation);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_record_is_not_found() {
        let err = ApiError::from(StoreError::NotFound(3));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn storage_failure_hides_details() {
        let err = ApiError::from(StoreError::Sqlite(
            rusqlite_error_for_tests(),
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "storage failure");
    }

    #[test]
    fn advice_errors_are_internal() {
        assert_eq!(
            ApiError::AdviceNotConfigured.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let err = ApiError::from(AdviceError::Api {
            message: "overloaded".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn rusqlite_error_for_tests() -> rusqlite::Error {
        rusqlite::Error::QueryReturnedNoRows
    }
}
