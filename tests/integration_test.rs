//! End-to-end checks against a running server backed by PostgreSQL.
//!
//! Start the service, then run with `cargo test -- --ignored`.
//! `BASE_URL` defaults to `http://localhost:3000`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct CreatedBarn {
    barn: Barn,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Barn {
    id: i32,
    silo: Unit,
    environmental_metrics: Unit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Unit {
    id: i32,
    sensor_code: String,
}

#[derive(Debug, Deserialize)]
struct BarnSummary {
    barn_id: i32,
    silo: SiloSummary,
}

#[derive(Debug, Deserialize)]
struct SiloSummary {
    last_20_readings: Vec<LevelReading>,
}

#[derive(Debug, Deserialize)]
struct LevelReading {
    level_value: f64,
    percentage: Option<f64>,
    timestamp: DateTime<Utc>,
}

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into())
}

async fn create_barn(client: &Client, code: &str) -> Result<Barn> {
    // ---
    let created: CreatedBarn = client
        .post(format!("{}/barn", base_url()))
        .json(&json!({
            "barn_name": format!("barn-{code}"),
            "silo_sensor_code": format!("S-{code}"),
            "env_sensor_code": format!("E-{code}")
        }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(created.barn)
}

#[tokio::test]
#[ignore = "needs a running server and database"]
async fn barn_history_is_capped_and_ordered() -> Result<()> {
    // ---
    let client = Client::new();
    let code = Utc::now().timestamp_micros().to_string();
    let barn = create_barn(&client, &code).await?;

    assert_eq!(barn.silo.sensor_code, format!("S-{code}"));
    assert_eq!(barn.environmental_metrics.sensor_code, format!("E-{code}"));

    for level in 0..25 {
        let resp = client
            .post(format!("{}/silo/reading", base_url()))
            .json(&json!({ "silo_id": barn.silo.id, "level_value": level }))
            .send()
            .await?;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let barns: Vec<BarnSummary> = client
        .get(format!("{}/barns", base_url()))
        .send()
        .await?
        .json()
        .await?;

    let summary = barns
        .iter()
        .find(|b| b.barn_id == barn.id)
        .expect("created barn is listed");
    let readings = &summary.silo.last_20_readings;

    assert_eq!(readings.len(), 20);
    assert!(readings
        .windows(2)
        .all(|w| w[0].timestamp >= w[1].timestamp));
    assert_eq!(readings[0].level_value, 24.0);
    assert_eq!(readings[0].percentage, Some(24.0 / 200.0 * 100.0));

    Ok(())
}

#[tokio::test]
#[ignore = "needs a running server and database"]
async fn invalid_readings_are_rejected() -> Result<()> {
    // ---
    let client = Client::new();
    let code = Utc::now().timestamp_micros().to_string();
    let barn = create_barn(&client, &code).await?;

    let resp = client
        .post(format!("{}/silo/reading", base_url()))
        .json(&json!({ "silo_id": barn.silo.id, "level_value": "abc" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{}/silo/reading", base_url()))
        .json(&json!({ "silo_id": i32::MAX, "level_value": 10 }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .put(format!("{}/barn/{}", base_url(), i32::MAX))
        .json(&json!({ "barn_name": "nobody" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
#[ignore = "needs a running server and database"]
async fn latest_environment_reading_matches_insert() -> Result<()> {
    // ---
    let client = Client::new();
    let code = Utc::now().timestamp_micros().to_string();
    let barn = create_barn(&client, &code).await?;

    let recorded: Value = client
        .post(format!("{}/environment/reading", base_url()))
        .json(&json!({
            "metrics_id": barn.environmental_metrics.id,
            "temperature": "22.5",
            "humidity": 61
        }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let latest: Value = client
        .get(format!("{}/environment/latest", base_url()))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    assert_eq!(latest["data"]["temperature"], recorded["temperature"]);
    assert_eq!(latest["data"]["humidity"], recorded["humidity"]);
    assert_eq!(latest["data"]["timestamp"], recorded["timestamp"]);

    Ok(())
}

#[tokio::test]
#[ignore = "needs a running server and database"]
async fn partial_update_keeps_silo_state() -> Result<()> {
    // ---
    let client = Client::new();
    let code = Utc::now().timestamp_micros().to_string();
    let barn = create_barn(&client, &code).await?;

    client
        .post(format!("{}/silo/reading", base_url()))
        .json(&json!({ "silo_id": barn.silo.id, "level_value": "150" }))
        .send()
        .await?
        .error_for_status()?;

    let silos_of = |all: Vec<Value>| {
        all.into_iter()
            .find(|s| s["id"] == json!(barn.silo.id))
            .expect("created silo is listed")
    };

    let before: Vec<Value> = client
        .get(format!("{}/silos", base_url()))
        .send()
        .await?
        .json()
        .await?;
    let before = silos_of(before);

    let updated: Value = client
        .put(format!("{}/barn/{}", base_url(), barn.id))
        .json(&json!({ "barn_name": format!("renamed-{code}") }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    assert_eq!(updated["barn"]["name"], format!("renamed-{code}"));
    assert_eq!(updated["barn"]["silo"]["sensorCode"], format!("S-{code}"));
    assert_eq!(
        updated["barn"]["environmentalMetrics"]["sensorCode"],
        format!("E-{code}")
    );

    let after: Vec<Value> = client
        .get(format!("{}/silos", base_url()))
        .send()
        .await?
        .json()
        .await?;
    let after = silos_of(after);

    for key in ["sensor_code", "last_level_value", "last_percentage", "last_timestamp"] {
        assert_eq!(after[key], before[key], "{key} changed");
    }
    assert_eq!(after["last_percentage"], 75.0);

    Ok(())
}
