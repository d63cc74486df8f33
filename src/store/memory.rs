//! In-process [`Store`] used by the router tests.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Barn, BarnHistory, BarnPatch, EnvironmentalData, EnvironmentalMetrics, NewBarn, Silo,
    SiloLevelData,
};

// ---

#[derive(Default)]
struct Tables {
    barns: Vec<Barn>,
    silo_levels: Vec<SiloLevelData>,
    environment: Vec<EnvironmentalData>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn silo_reading_count(&self) -> usize {
        self.tables.read().silo_levels.len()
    }

    pub fn environment_reading_count(&self) -> usize {
        self.tables.read().environment.len()
    }
}

/// Newest first, ties broken by insertion order.
fn newest_first<T>(rows: &mut [&T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i32)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_barn(&self, new: NewBarn) -> StoreResult<Barn> {
        // ---
        let mut t = self.tables.write();
        let barn_id = t.next_id();
        let barn = Barn {
            id: barn_id,
            name: new.barn_name,
            silo: Silo {
                id: t.next_id(),
                name: new.silo_name,
                sensor_code: new.silo_sensor_code,
                barn_id,
            },
            environmental_metrics: EnvironmentalMetrics {
                id: t.next_id(),
                name: new.env_name,
                sensor_code: new.env_sensor_code,
                barn_id,
            },
        };
        t.barns.push(barn.clone());
        Ok(barn)
    }

    async fn update_barn(&self, id: i32, patch: &BarnPatch) -> StoreResult<Option<Barn>> {
        // ---
        let mut t = self.tables.write();
        Ok(t.barns.iter_mut().find(|b| b.id == id).map(|barn| {
            *barn = patch.apply(barn);
            barn.clone()
        }))
    }

    async fn barn_histories(&self, limit: i64) -> StoreResult<Vec<BarnHistory>> {
        // ---
        let t = self.tables.read();
        let limit = usize::try_from(limit).unwrap_or(0);

        Ok(t.barns
            .iter()
            .map(|barn| {
                let mut silo: Vec<_> = t
                    .silo_levels
                    .iter()
                    .filter(|r| r.silo_id == barn.silo.id)
                    .collect();
                newest_first(&mut silo, |r| (r.timestamp, r.id));

                let mut env: Vec<_> = t
                    .environment
                    .iter()
                    .filter(|r| r.metrics_id == barn.environmental_metrics.id)
                    .collect();
                newest_first(&mut env, |r| (r.timestamp, r.id));

                BarnHistory {
                    barn: barn.clone(),
                    silo_readings: silo.into_iter().take(limit).cloned().collect(),
                    environment_readings: env.into_iter().take(limit).cloned().collect(),
                }
            })
            .collect())
    }

    async fn find_silo(&self, id: i32) -> StoreResult<Option<Silo>> {
        let t = self.tables.read();
        Ok(t.barns.iter().map(|b| &b.silo).find(|s| s.id == id).cloned())
    }

    async fn insert_silo_reading(
        &self,
        silo_id: i32,
        level_value: Decimal,
    ) -> StoreResult<SiloLevelData> {
        // ---
        let mut t = self.tables.write();
        if !t.barns.iter().any(|b| b.silo.id == silo_id) {
            return Err(StoreError::Integrity(format!("silo {silo_id}")));
        }
        let reading = SiloLevelData {
            id: t.next_id(),
            silo_id,
            level_value,
            timestamp: Utc::now(),
        };
        t.silo_levels.push(reading.clone());
        Ok(reading)
    }

    async fn find_environmental_metrics(
        &self,
        id: i32,
    ) -> StoreResult<Option<EnvironmentalMetrics>> {
        let t = self.tables.read();
        Ok(t.barns
            .iter()
            .map(|b| &b.environmental_metrics)
            .find(|m| m.id == id)
            .cloned())
    }

    async fn insert_environmental_reading(
        &self,
        metrics_id: i32,
        temperature: Decimal,
        humidity: Decimal,
    ) -> StoreResult<EnvironmentalData> {
        // ---
        let mut t = self.tables.write();
        if !t.barns.iter().any(|b| b.environmental_metrics.id == metrics_id) {
            return Err(StoreError::Integrity(format!(
                "environmental unit {metrics_id}"
            )));
        }
        let reading = EnvironmentalData {
            id: t.next_id(),
            metrics_id,
            temperature,
            humidity,
            timestamp: Utc::now(),
        };
        t.environment.push(reading.clone());
        Ok(reading)
    }

    async fn latest_silo_levels(&self) -> StoreResult<Vec<(Silo, Option<SiloLevelData>)>> {
        // ---
        let t = self.tables.read();
        Ok(t.barns
            .iter()
            .map(|b| {
                let latest = t
                    .silo_levels
                    .iter()
                    .filter(|r| r.silo_id == b.silo.id)
                    .max_by_key(|r| (r.timestamp, r.id))
                    .cloned();
                (b.silo.clone(), latest)
            })
            .collect())
    }

    async fn latest_environment(
        &self,
    ) -> StoreResult<Vec<(EnvironmentalMetrics, Option<EnvironmentalData>)>> {
        // ---
        let t = self.tables.read();
        Ok(t.barns
            .iter()
            .map(|b| {
                let latest = t
                    .environment
                    .iter()
                    .filter(|r| r.metrics_id == b.environmental_metrics.id)
                    .max_by_key(|r| (r.timestamp, r.id))
                    .cloned();
                (b.environmental_metrics.clone(), latest)
            })
            .collect())
    }

    async fn latest_environmental_reading(&self) -> StoreResult<Option<EnvironmentalData>> {
        let t = self.tables.read();
        Ok(t.environment
            .iter()
            .max_by_key(|r| (r.timestamp, r.id))
            .cloned())
    }
}
