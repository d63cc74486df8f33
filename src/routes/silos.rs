// src/routes/silos.rs
//! Silo level readings: recording and the latest-value overview.

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
use crate::models::level_percentage;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/silo/reading", post(record_reading))
        .route("/silos", get(list_silos))
}

#[derive(Serialize)]
struct ReadingRecorded {
    message: &'static str,
    silo_id: i32,
    level_value: Decimal,
    percentage: Option<f64>,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct SiloLatest {
    id: i32,
    sensor_code: String,
    last_level_value: Option<Decimal>,
    last_percentage: Option<f64>,
    last_timestamp: Option<DateTime<Utc>>,
    consulted_at: DateTime<Utc>,
}

/// Handle `POST /silo/reading`.
///
/// Both fields are validated before the store is touched.
async fn record_reading(
    State(store): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // ---
    info!("POST /silo/reading");

    let body = body_object(body)?;
    let silo_id = parse_id("silo_id", body.get("silo_id"))?;
    let level_value = parse_decimal("level_value", body.get("level_value"))?;

    let silo = store
        .find_silo(silo_id)
        .await
        .context("Failed to save silo reading")?
        .ok_or_else(|| ApiError::not_found("Silo not found"))?;

    let reading = store
        .insert_silo_reading(silo.id, level_value)
        .await
        .context("Failed to save silo reading")?;

    Ok((
        StatusCode::CREATED,
        Json(ReadingRecorded {
            message: "Silo level reading recorded.",
            silo_id: silo.id,
            level_value: reading.level_value,
            percentage: level_percentage(reading.level_value),
            timestamp: reading.timestamp,
        }),
    ))
}

/// Handle `GET /silos`.
async fn list_silos(State(store): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    // ---
    info!("GET /silos");

    let silos = store
        .latest_silo_levels()
        .await
        .context("Failed to fetch silos")?;

    let consulted_at = Utc::now();
    let result: Vec<SiloLatest> = silos
        .into_iter()
        .map(|(silo, last)| SiloLatest {
            id: silo.id,
            sensor_code: silo.sensor_code,
            last_level_value: last.as_ref().map(|r| r.level_value),
            last_percentage: last.as_ref().and_then(|r| level_percentage(r.level_value)),
            last_timestamp: last.map(|r| r.timestamp),
            consulted_at,
        })
        .collect();

    Ok(Json(result))
}
