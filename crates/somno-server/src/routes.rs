//! REST surface for the sleep tracker.
//!
//! Bodies are decoded from `serde_json::Value` by hand so shape problems
//! come back as 400 with a readable message, matching the validation
//! contract, instead of axum's default 422.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use somno_llm::AdvicePayload;

use crate::error::ApiError;
use crate::service::{RecordService, SleepInput};

/// Builds the application router.
pub fn router(service: Arc<RecordService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sleep", get(list_records).post(create_record))
        .route("/sleep/stats", get(daily_stats))
        .route("/sleep/stats/weekly-duration", get(weekly_stats))
        .route("/sleep/stats/hour-distribution", get(hour_distribution))
        .route("/sleep/advice", axum::routing::post(advice))
        .route(
            "/sleep/:id",
            axum::routing::put(update_record).delete(delete_record),
        )
        .with_state(service)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_record(
    State(service): State<Arc<RecordService>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let input: SleepInput = decode(body)?;
    let record = service.create_record(input).await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

async fn list_records(
    State(service): State<Arc<RecordService>>,
) -> Result<Response, ApiError> {
    let records = service.list_records().await?;
    Ok(Json(records).into_response())
}

async fn update_record(
    State(service): State<Arc<RecordService>>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let input: SleepInput = decode(body)?;
    let record = service.update_record(id, input).await?;
    Ok(Json(record).into_response())
}

async fn delete_record(
    State(service): State<Arc<RecordService>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    service.delete_record(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn daily_stats(State(service): State<Arc<RecordService>>) -> Result<Response, ApiError> {
    let stats = service.daily_stats().await?;
    Ok(Json(stats).into_response())
}

async fn weekly_stats(State(service): State<Arc<RecordService>>) -> Result<Response, ApiError> {
    let stats = service.weekly_stats().await?;
    Ok(Json(stats).into_response())
}

async fn hour_distribution(
    State(service): State<Arc<RecordService>>,
) -> Result<Response, ApiError> {
    let stats = service.hour_distribution().await?;
    Ok(Json(stats).into_response())
}

async fn advice(
    State(service): State<Arc<RecordService>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let payload: AdvicePayload = decode(body)?;
    let advice = service.advice(&payload).await?;
    Ok(Json(json!({ "advice": advice })).into_response())
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|err| ApiError::Body(err.to_string()))
}
