use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Barn, BarnHistory, BarnPatch, EnvironmentalData, EnvironmentalMetrics, NewBarn, Silo,
    SiloLevelData,
};

// ---

/// PostgreSQL error code for `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Barn joined with both of its units, one row per barn.
const BARN_SELECT: &str = r#"
    SELECT b.id          AS barn_id,
           b.name        AS barn_name,
           s.id          AS silo_id,
           s.name        AS silo_name,
           s.sensor_code AS silo_sensor_code,
           m.id          AS metrics_id,
           m.name        AS metrics_name,
           m.sensor_code AS metrics_sensor_code
      FROM barn b
      JOIN silo s                  ON s.barn_id = b.id
      JOIN environmental_metrics m ON m.barn_id = b.id
"#;

#[derive(sqlx::FromRow)]
struct BarnRow {
    barn_id: i32,
    barn_name: String,
    silo_id: i32,
    silo_name: Option<String>,
    silo_sensor_code: String,
    metrics_id: i32,
    metrics_name: Option<String>,
    metrics_sensor_code: String,
}

impl From<BarnRow> for Barn {
    fn from(row: BarnRow) -> Self {
        Barn {
            id: row.barn_id,
            name: row.barn_name,
            silo: Silo {
                id: row.silo_id,
                name: row.silo_name,
                sensor_code: row.silo_sensor_code,
                barn_id: row.barn_id,
            },
            environmental_metrics: EnvironmentalMetrics {
                id: row.metrics_id,
                name: row.metrics_name,
                sensor_code: row.metrics_sensor_code,
                barn_id: row.barn_id,
            },
        }
    }
}

/// A unit row left-joined with its newest reading.
#[derive(sqlx::FromRow)]
struct LatestSiloRow {
    #[sqlx(flatten)]
    silo: Silo,
    reading_id: Option<i32>,
    level_value: Option<Decimal>,
    timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(sqlx::FromRow)]
struct LatestEnvironmentRow {
    #[sqlx(flatten)]
    metrics: EnvironmentalMetrics,
    reading_id: Option<i32>,
    temperature: Option<Decimal>,
    humidity: Option<Decimal>,
    timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

/// [`Store`] backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a foreign key violation on insert to [`StoreError::Integrity`].
fn reading_insert_error(err: sqlx::Error, what: String) -> StoreError {
    // ---
    let is_fk = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == FOREIGN_KEY_VIOLATION);

    if is_fk {
        StoreError::Integrity(what)
    } else {
        StoreError::Sql(err)
    }
}

async fn fetch_barn_for_update(conn: &mut PgConnection, id: i32) -> sqlx::Result<Option<Barn>> {
    // ---
    let sql = format!("{BARN_SELECT} WHERE b.id = $1 FOR UPDATE OF b, s, m");
    let row: Option<BarnRow> = sqlx::query_as(&sql).bind(id).fetch_optional(conn).await?;
    Ok(row.map(Barn::from))
}

#[async_trait]
impl Store for PgStore {
    async fn create_barn(&self, new: NewBarn) -> StoreResult<Barn> {
        // ---
        // Dropping `tx` without commit rolls all three inserts back
        let mut tx = self.pool.begin().await?;

        let (barn_id,): (i32,) = sqlx::query_as("INSERT INTO barn (name) VALUES ($1) RETURNING id")
            .bind(&new.barn_name)
            .fetch_one(&mut *tx)
            .await?;

        let silo: Silo = sqlx::query_as(
            r#"
            INSERT INTO silo (name, sensor_code, barn_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, sensor_code, barn_id
            "#,
        )
        .bind(&new.silo_name)
        .bind(&new.silo_sensor_code)
        .bind(barn_id)
        .fetch_one(&mut *tx)
        .await?;

        let environmental_metrics: EnvironmentalMetrics = sqlx::query_as(
            r#"
            INSERT INTO environmental_metrics (name, sensor_code, barn_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, sensor_code, barn_id
            "#,
        )
        .bind(&new.env_name)
        .bind(&new.env_sensor_code)
        .bind(barn_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Barn {
            id: barn_id,
            name: new.barn_name,
            silo,
            environmental_metrics,
        })
    }

    async fn update_barn(&self, id: i32, patch: &BarnPatch) -> StoreResult<Option<Barn>> {
        // ---
        let mut tx = self.pool.begin().await?;

        let Some(existing) = fetch_barn_for_update(&mut tx, id).await? else {
            return Ok(None);
        };
        let merged = patch.apply(&existing);

        sqlx::query("UPDATE barn SET name = $2 WHERE id = $1")
            .bind(merged.id)
            .bind(&merged.name)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE silo SET name = $2, sensor_code = $3 WHERE id = $1")
            .bind(merged.silo.id)
            .bind(&merged.silo.name)
            .bind(&merged.silo.sensor_code)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE environmental_metrics SET name = $2, sensor_code = $3 WHERE id = $1")
            .bind(merged.environmental_metrics.id)
            .bind(&merged.environmental_metrics.name)
            .bind(&merged.environmental_metrics.sensor_code)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(merged))
    }

    async fn barn_histories(&self, limit: i64) -> StoreResult<Vec<BarnHistory>> {
        // ---
        let barns: Vec<BarnRow> = sqlx::query_as(&format!("{BARN_SELECT} ORDER BY b.id"))
            .fetch_all(&self.pool)
            .await?;

        let silo_readings: Vec<SiloLevelData> = sqlx::query_as(
            r#"
            SELECT id, silo_id, level_value, timestamp
              FROM (SELECT d.*,
                           ROW_NUMBER() OVER (PARTITION BY silo_id
                                              ORDER BY timestamp DESC, id DESC) AS rn
                      FROM silo_level_data d) ranked
             WHERE rn <= $1
             ORDER BY silo_id, timestamp DESC, id DESC
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let environment_readings: Vec<EnvironmentalData> = sqlx::query_as(
            r#"
            SELECT id, metrics_id, temperature, humidity, timestamp
              FROM (SELECT d.*,
                           ROW_NUMBER() OVER (PARTITION BY metrics_id
                                              ORDER BY timestamp DESC, id DESC) AS rn
                      FROM environmental_data d) ranked
             WHERE rn <= $1
             ORDER BY metrics_id, timestamp DESC, id DESC
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut by_silo: HashMap<i32, Vec<SiloLevelData>> = HashMap::new();
        for r in silo_readings {
            by_silo.entry(r.silo_id).or_default().push(r);
        }
        let mut by_metrics: HashMap<i32, Vec<EnvironmentalData>> = HashMap::new();
        for r in environment_readings {
            by_metrics.entry(r.metrics_id).or_default().push(r);
        }

        Ok(barns
            .into_iter()
            .map(Barn::from)
            .map(|barn| BarnHistory {
                silo_readings: by_silo.remove(&barn.silo.id).unwrap_or_default(),
                environment_readings: by_metrics
                    .remove(&barn.environmental_metrics.id)
                    .unwrap_or_default(),
                barn,
            })
            .collect())
    }

    async fn find_silo(&self, id: i32) -> StoreResult<Option<Silo>> {
        // ---
        let silo = sqlx::query_as("SELECT id, name, sensor_code, barn_id FROM silo WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(silo)
    }

    async fn insert_silo_reading(
        &self,
        silo_id: i32,
        level_value: Decimal,
    ) -> StoreResult<SiloLevelData> {
        // ---
        sqlx::query_as(
            r#"
            INSERT INTO silo_level_data (silo_id, level_value)
            VALUES ($1, $2)
            RETURNING id, silo_id, level_value, timestamp
            "#,
        )
        .bind(silo_id)
        .bind(level_value)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| reading_insert_error(e, format!("silo {silo_id}")))
    }

    async fn find_environmental_metrics(
        &self,
        id: i32,
    ) -> StoreResult<Option<EnvironmentalMetrics>> {
        // ---
        let metrics = sqlx::query_as(
            "SELECT id, name, sensor_code, barn_id FROM environmental_metrics WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(metrics)
    }

    async fn insert_environmental_reading(
        &self,
        metrics_id: i32,
        temperature: Decimal,
        humidity: Decimal,
    ) -> StoreResult<EnvironmentalData> {
        // ---
        sqlx::query_as(
            r#"
            INSERT INTO environmental_data (metrics_id, temperature, humidity)
            VALUES ($1, $2, $3)
            RETURNING id, metrics_id, temperature, humidity, timestamp
            "#,
        )
        .bind(metrics_id)
        .bind(temperature)
        .bind(humidity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| reading_insert_error(e, format!("environmental unit {metrics_id}")))
    }

    async fn latest_silo_levels(&self) -> StoreResult<Vec<(Silo, Option<SiloLevelData>)>> {
        // ---
        let rows: Vec<LatestSiloRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.name, s.sensor_code, s.barn_id,
                   d.id AS reading_id, d.level_value, d.timestamp
              FROM silo s
              LEFT JOIN LATERAL (
                    SELECT id, level_value, timestamp
                      FROM silo_level_data
                     WHERE silo_id = s.id
                     ORDER BY timestamp DESC, id DESC
                     LIMIT 1
                   ) d ON true
             ORDER BY s.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let reading = match (row.reading_id, row.level_value, row.timestamp) {
                    (Some(id), Some(level_value), Some(timestamp)) => Some(SiloLevelData {
                        id,
                        silo_id: row.silo.id,
                        level_value,
                        timestamp,
                    }),
                    _ => None,
                };
                (row.silo, reading)
            })
            .collect())
    }

    async fn latest_environment(
        &self,
    ) -> StoreResult<Vec<(EnvironmentalMetrics, Option<EnvironmentalData>)>> {
        // ---
        let rows: Vec<LatestEnvironmentRow> = sqlx::query_as(
            r#"
            SELECT m.id, m.name, m.sensor_code, m.barn_id,
                   d.id AS reading_id, d.temperature, d.humidity, d.timestamp
              FROM environmental_metrics m
              LEFT JOIN LATERAL (
                    SELECT id, temperature, humidity, timestamp
                      FROM environmental_data
                     WHERE metrics_id = m.id
                     ORDER BY timestamp DESC, id DESC
                     LIMIT 1
                   ) d ON true
             ORDER BY m.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let reading = match (row.reading_id, row.temperature, row.humidity, row.timestamp)
                {
                    (Some(id), Some(temperature), Some(humidity), Some(timestamp)) => {
                        Some(EnvironmentalData {
                            id,
                            metrics_id: row.metrics.id,
                            temperature,
                            humidity,
                            timestamp,
                        })
                    }
                    _ => None,
                };
                (row.metrics, reading)
            })
            .collect())
    }

    async fn latest_environmental_reading(&self) -> StoreResult<Option<EnvironmentalData>> {
        // ---
        let reading = sqlx::query_as(
            r#"
            SELECT id, metrics_id, temperature, humidity, timestamp
              FROM environmental_data
             ORDER BY timestamp DESC, id DESC
             LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(reading)
    }
}
