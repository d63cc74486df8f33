//! Persistence boundary.
//!
//! Handlers only talk to a [`Store`]. Multi-entity writes (creating or
//! updating a barn together with its silo and environmental unit) are a
//! single call so the implementation can scope them in one transaction.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    Barn, BarnHistory, BarnPatch, EnvironmentalData, EnvironmentalMetrics, NewBarn, Silo,
    SiloLevelData,
};

#[cfg(test)]
pub mod memory;
mod postgres;

pub use postgres::PgStore;

// ---

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
    #[error("Dangling reference: {0}")]
    Integrity(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Create a barn with its silo and environmental unit, all or nothing.
    async fn create_barn(&self, new: NewBarn) -> StoreResult<Barn>;

    /// Merge `patch` over the stored barn and write all three rows in one
    /// transaction. `None` if no barn has this id.
    async fn update_barn(&self, id: i32, patch: &BarnPatch) -> StoreResult<Option<Barn>>;

    /// Every barn with up to `limit` readings per unit, newest first.
    async fn barn_histories(&self, limit: i64) -> StoreResult<Vec<BarnHistory>>;

    async fn find_silo(&self, id: i32) -> StoreResult<Option<Silo>>;

    async fn insert_silo_reading(
        &self,
        silo_id: i32,
        level_value: Decimal,
    ) -> StoreResult<SiloLevelData>;

    async fn find_environmental_metrics(&self, id: i32)
        -> StoreResult<Option<EnvironmentalMetrics>>;

    async fn insert_environmental_reading(
        &self,
        metrics_id: i32,
        temperature: Decimal,
        humidity: Decimal,
    ) -> StoreResult<EnvironmentalData>;

    /// Every silo with its most recent reading, if any.
    async fn latest_silo_levels(&self) -> StoreResult<Vec<(Silo, Option<SiloLevelData>)>>;

    /// Every environmental unit with its most recent reading, if any.
    async fn latest_environment(
        &self,
    ) -> StoreResult<Vec<(EnvironmentalMetrics, Option<EnvironmentalData>)>>;

    /// The most recent environmental reading across all units.
    async fn latest_environmental_reading(&self) -> StoreResult<Option<EnvironmentalData>>;
}
