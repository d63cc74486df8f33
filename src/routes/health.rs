// src/routes/health.rs
//! Index banner and liveness check.
//!
//! Neither route touches the database, so both answer as long as the
//! process is serving HTTP.

use axum::{response::Html, routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

const BANNER: &str = r#"<h1 style="text-align: center">Feed Silo Monitor API - Online</h1>"#;

/// Handle `GET /`.
async fn index() -> Html<&'static str> {
    Html(BANNER)
}

/// Handle `GET /health`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create a subrouter containing the `/` and `/health` routes.
///
/// Generic over the application state so it merges into the gateway router
/// regardless of the state type.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}
