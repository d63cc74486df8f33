use std::sync::Arc;

use axum::Router;

use crate::store::Store;

mod barns;
mod environment;
mod health;
mod params;
mod silos;

// ---

/// Shared handler state: the persistence collaborator.
pub type AppState = Arc<dyn Store>;

pub fn router(store: AppState) -> Router {
    // ---
    Router::new()
        .merge(barns::router())
        .merge(silos::router())
        .merge(environment::router())
        .merge(health::router())
        .with_state(store)
}
