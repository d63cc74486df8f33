//! Database schema bootstrap for `silo-monitor`.
//!
//! Ensures the entity tables and their indexes exist before serving
//! requests. Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Statements run in order inside one transaction. All are idempotent.
const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS barn (
        id   SERIAL PRIMARY KEY,
        name TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS silo (
        id          SERIAL PRIMARY KEY,
        name        TEXT,
        sensor_code TEXT    NOT NULL,
        barn_id     INTEGER NOT NULL UNIQUE REFERENCES barn (id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS silo_level_data (
        id          SERIAL PRIMARY KEY,
        silo_id     INTEGER     NOT NULL REFERENCES silo (id),
        level_value NUMERIC     NOT NULL,
        timestamp   TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS environmental_metrics (
        id          SERIAL PRIMARY KEY,
        name        TEXT,
        sensor_code TEXT    NOT NULL,
        barn_id     INTEGER NOT NULL UNIQUE REFERENCES barn (id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS environmental_data (
        id          SERIAL PRIMARY KEY,
        metrics_id  INTEGER     NOT NULL REFERENCES environmental_metrics (id),
        temperature NUMERIC     NOT NULL,
        humidity    NUMERIC     NOT NULL,
        timestamp   TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    "#,
    // Reading history is always fetched newest first per unit
    r#"
    CREATE INDEX IF NOT EXISTS idx_silo_level_data_silo_ts
        ON silo_level_data (silo_id, timestamp DESC);
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_environmental_data_metrics_ts
        ON environmental_data (metrics_id, timestamp DESC);
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_environmental_data_ts
        ON environmental_data (timestamp DESC);
    "#,
];

/// Create the schema if it does not exist.
///
/// Safe to call on every startup; existing tables are never altered.
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    for stmt in STATEMENTS {
        sqlx::query(stmt).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    Ok(())
}
