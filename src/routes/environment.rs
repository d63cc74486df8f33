// src/routes/environment.rs
//! Temperature/humidity readings.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::params::{body_object, parse_decimal, parse_id};
use super::AppState;
use crate::error::{ApiError, StoreContext};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/environment/reading", post(record_reading))
        .route("/environment", get(list_environment))
        .route("/environment/latest", get(latest_reading))
}

#[derive(Serialize)]
struct ReadingRecorded {
    message: &'static str,
    temperature: Decimal,
    humidity: Decimal,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct EnvironmentLatest {
    id: i32,
    sensor_code: String,
    temperature: Option<Decimal>,
    humidity: Option<Decimal>,
    last_timestamp: Option<DateTime<Utc>>,
    consulted_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct LatestResponse {
    message: &'static str,
    data: LatestData,
}

#[derive(Serialize)]
struct LatestData {
    id: i32,
    temperature: Decimal,
    humidity: Decimal,
    timestamp: DateTime<Utc>,
}

/// Handle `POST /environment/reading`.
async fn record_reading(
    State(store): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // ---
    info!("POST /environment/reading");

    let body = body_object(body)?;
    let metrics_id = parse_id("metrics_id", body.get("metrics_id"))?;
    let temperature = parse_decimal("temperature", body.get("temperature"))?;
    let humidity = parse_decimal("humidity", body.get("humidity"))?;

    let metrics = store
        .find_environmental_metrics(metrics_id)
        .await
        .context("Failed to save environmental reading")?
        .ok_or_else(|| ApiError::not_found("Environmental unit not found"))?;

    let reading = store
        .insert_environmental_reading(metrics.id, temperature, humidity)
        .await
        .context("Failed to save environmental reading")?;

    Ok((
        StatusCode::CREATED,
        Json(ReadingRecorded {
            message: "Environmental reading recorded.",
            temperature: reading.temperature,
            humidity: reading.humidity,
            timestamp: reading.timestamp,
        }),
    ))
}

/// Handle `GET /environment`.
async fn list_environment(State(store): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    // ---
    info!("GET /environment");

    let units = store
        .latest_environment()
        .await
        .context("Failed to fetch environmental data")?;

    let consulted_at = Utc::now();
    let result: Vec<EnvironmentLatest> = units
        .into_iter()
        .map(|(unit, last)| EnvironmentLatest {
            id: unit.id,
            sensor_code: unit.sensor_code,
            temperature: last.as_ref().map(|r| r.temperature),
            humidity: last.as_ref().map(|r| r.humidity),
            last_timestamp: last.map(|r| r.timestamp),
            consulted_at,
        })
        .collect();

    Ok(Json(result))
}

/// Handle `GET /environment/latest`.
async fn latest_reading(State(store): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    // ---
    info!("GET /environment/latest");

    let reading = store
        .latest_environmental_reading()
        .await
        .context("Failed to fetch environmental data")?
        .ok_or_else(|| ApiError::not_found("No environmental readings recorded"))?;

    Ok(Json(LatestResponse {
        message: "Latest environmental reading.",
        data: LatestData {
            id: reading.id,
            temperature: reading.temperature,
            humidity: reading.humidity,
            timestamp: reading.timestamp,
        },
    }))
}
