//! Data models for barns, their sensor units and readings.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

// ---

/// Assumed full capacity of every silo, in the same unit as `level_value`.
pub const SILO_CAPACITY: f64 = 200.0;

/// Number of readings returned per unit by the barn history listing.
pub const HISTORY_LENGTH: i64 = 20;

/// Fill level expressed as a percentage of [`SILO_CAPACITY`].
///
/// Returns `None` when the result is not a finite number, so a bad value is
/// rendered as JSON `null` instead of `NaN`.
pub fn percentage(level_value: f64) -> Option<f64> {
    // ---
    let pct = level_value / SILO_CAPACITY * 100.0;
    pct.is_finite().then_some(pct)
}

/// [`percentage`] for a stored decimal level.
pub fn level_percentage(level_value: Decimal) -> Option<f64> {
    level_value.to_f64().and_then(percentage)
}

/// Top-level grouping of one silo and one environmental unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Barn {
    // ---
    pub id: i32,
    pub name: String,
    pub silo: Silo,
    pub environmental_metrics: EnvironmentalMetrics,
}

/// Feed-storage unit tracked by level readings.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Silo {
    // ---
    pub id: i32,
    pub name: Option<String>,
    pub sensor_code: String,
    pub barn_id: i32,
}

/// Temperature/humidity sensor unit.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalMetrics {
    // ---
    pub id: i32,
    pub name: Option<String>,
    pub sensor_code: String,
    pub barn_id: i32,
}

/// One silo level measurement. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SiloLevelData {
    // ---
    pub id: i32,
    pub silo_id: i32,
    pub level_value: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// One temperature/humidity measurement. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalData {
    // ---
    pub id: i32,
    pub metrics_id: i32,
    pub temperature: Decimal,
    pub humidity: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// A barn with the most recent readings of both its units, newest first.
#[derive(Debug, Clone)]
pub struct BarnHistory {
    // ---
    pub barn: Barn,
    pub silo_readings: Vec<SiloLevelData>,
    pub environment_readings: Vec<EnvironmentalData>,
}

/// Everything needed to create a barn and its two units in one step.
#[derive(Debug, Clone)]
pub struct NewBarn {
    // ---
    pub barn_name: String,
    pub silo_name: Option<String>,
    pub env_name: Option<String>,
    pub silo_sensor_code: String,
    pub env_sensor_code: String,
}

/// Sparse update of a barn's mutable metadata.
///
/// `None` means "keep the stored value". Ids and timestamps are never part
/// of a patch.
#[derive(Debug, Clone, Default)]
pub struct BarnPatch {
    // ---
    pub barn_name: Option<String>,
    pub silo_name: Option<String>,
    pub env_name: Option<String>,
    pub silo_sensor_code: Option<String>,
    pub env_sensor_code: Option<String>,
}

impl BarnPatch {
    /// Field-by-field merge of this patch over `existing`.
    pub fn apply(&self, existing: &Barn) -> Barn {
        // ---
        let pick = |new: &Option<String>, old: &String| {
            new.clone().unwrap_or_else(|| old.clone())
        };
        let pick_opt = |new: &Option<String>, old: &Option<String>| {
            new.clone().or_else(|| old.clone())
        };

        Barn {
            id: existing.id,
            name: pick(&self.barn_name, &existing.name),
            silo: Silo {
                name: pick_opt(&self.silo_name, &existing.silo.name),
                sensor_code: pick(&self.silo_sensor_code, &existing.silo.sensor_code),
                ..existing.silo.clone()
            },
            environmental_metrics: EnvironmentalMetrics {
                name: pick_opt(&self.env_name, &existing.environmental_metrics.name),
                sensor_code: pick(
                    &self.env_sensor_code,
                    &existing.environmental_metrics.sensor_code,
                ),
                ..existing.environmental_metrics.clone()
            },
        }
    }
}
