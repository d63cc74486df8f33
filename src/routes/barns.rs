// src/routes/barns.rs
//! Barn endpoints: cascading create, partial update and the history listing.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::params::{body_object, optional_string, parse_path_id, required_string};
use super::AppState;
use crate::error::{ApiError, StoreContext};
use crate::models::{level_percentage, Barn, BarnHistory, BarnPatch, NewBarn, HISTORY_LENGTH};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/barn", post(create_barn))
        .route("/barn/{id}", put(update_barn))
        .route("/barns", get(list_barns))
}

#[derive(Serialize)]
struct BarnResponse {
    message: &'static str,
    barn: Barn,
}

#[derive(Serialize)]
struct BarnSummary {
    barn_id: i32,
    barn_name: String,
    silo: SiloSummary,
    environment: EnvironmentSummary,
    consulted_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct SiloSummary {
    id: i32,
    name: Option<String>,
    sensor_code: String,
    last_20_readings: Vec<LevelReading>,
}

#[derive(Serialize)]
struct LevelReading {
    level_value: Decimal,
    percentage: Option<f64>,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct EnvironmentSummary {
    id: i32,
    name: Option<String>,
    sensor_code: String,
    last_20_readings: Vec<ClimateReading>,
}

#[derive(Serialize)]
struct ClimateReading {
    temperature: Decimal,
    humidity: Decimal,
    timestamp: DateTime<Utc>,
}

/// Handle `POST /barn`.
async fn create_barn(
    State(store): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // ---
    info!("POST /barn");

    let body = body_object(body)?;
    let new = NewBarn {
        barn_name: required_string("barn_name", body.get("barn_name"))?,
        silo_name: optional_string("silo_name", body.get("silo_name"))?,
        env_name: optional_string("env_name", body.get("env_name"))?,
        silo_sensor_code: required_string("silo_sensor_code", body.get("silo_sensor_code"))?,
        env_sensor_code: required_string("env_sensor_code", body.get("env_sensor_code"))?,
    };

    let barn = store
        .create_barn(new)
        .await
        .context("Failed to create barn")?;
    info!(barn_id = barn.id, "Barn created");

    Ok((
        StatusCode::CREATED,
        Json(BarnResponse {
            message: "Barn created successfully.",
            barn,
        }),
    ))
}

/// Handle `PUT /barn/{id}`. Omitted fields keep their stored value.
async fn update_barn(
    State(store): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // ---
    info!("PUT /barn/{}", raw_id);

    let id = parse_path_id("id", &raw_id)?;
    let body = body_object(body)?;
    let patch = BarnPatch {
        barn_name: optional_string("barn_name", body.get("barn_name"))?,
        silo_name: optional_string("silo_name", body.get("silo_name"))?,
        env_name: optional_string("env_name", body.get("env_name"))?,
        silo_sensor_code: optional_string("silo_sensor_code", body.get("silo_sensor_code"))?,
        env_sensor_code: optional_string("env_sensor_code", body.get("env_sensor_code"))?,
    };

    let barn = store
        .update_barn(id, &patch)
        .await
        .context("Failed to update barn")?
        .ok_or_else(|| ApiError::not_found("Barn not found"))?;

    Ok(Json(BarnResponse {
        message: "Barn updated successfully.",
        barn,
    }))
}

/// Handle `GET /barns`.
async fn list_barns(State(store): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    // ---
    info!("GET /barns");

    let histories = store
        .barn_histories(HISTORY_LENGTH)
        .await
        .context("Failed to fetch barns")?;

    let consulted_at = Utc::now();
    let summaries: Vec<BarnSummary> = histories
        .into_iter()
        .map(|h| summarize(h, consulted_at))
        .collect();

    info!("Returning {} barns", summaries.len());
    Ok(Json(summaries))
}

fn summarize(history: BarnHistory, consulted_at: DateTime<Utc>) -> BarnSummary {
    // ---
    let BarnHistory {
        barn,
        silo_readings,
        environment_readings,
    } = history;

    BarnSummary {
        barn_id: barn.id,
        barn_name: barn.name,
        silo: SiloSummary {
            id: barn.silo.id,
            name: barn.silo.name,
            sensor_code: barn.silo.sensor_code,
            last_20_readings: silo_readings
                .into_iter()
                .map(|r| LevelReading {
                    level_value: r.level_value,
                    percentage: level_percentage(r.level_value),
                    timestamp: r.timestamp,
                })
                .collect(),
        },
        environment: EnvironmentSummary {
            id: barn.environmental_metrics.id,
            name: barn.environmental_metrics.name,
            sensor_code: barn.environmental_metrics.sensor_code,
            last_20_readings: environment_readings
                .into_iter()
                .map(|r| ClimateReading {
                    temperature: r.temperature,
                    humidity: r.humidity,
                    timestamp: r.timestamp,
                })
                .collect(),
        },
        consulted_at,
    }
}
