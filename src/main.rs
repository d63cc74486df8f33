//! Application entry point for the `silo-monitor` backend service.
//!
//! Startup sequence:
//! - Initialize structured logging/tracing
//! - Load configuration from environment variables or `.env`
//! - Establish a PostgreSQL connection pool (exit non-zero on failure)
//! - Create the database schema if it does not exist
//! - Mount all API routes via the `routes` gateway
//! - Bind the Axum HTTP server and serve requests
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – PostgreSQL connection string
//! - `PORT` (optional) – HTTP listen port (default: 3000)
//! - `DB_POOL_MAX` (optional) – maximum number of DB connections (default: 5)
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
use std::{env, net::SocketAddr, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

mod config;
mod error;
mod models;
mod routes;
mod schema;
mod store;

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    // `.env` first so it can carry the logging variables too
    dotenv().ok();
    init_tracing(TracingSettings::from_env());

    let cfg = config::load_from_env()?;
    cfg.log_config();

    tracing::info!("Attempting to connect to database: {}", cfg.masked_db_url());

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.db_url)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to connect to database '{}': {}",
                cfg.masked_db_url(),
                e
            )
        })?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;

    let app: Router = routes::router(Arc::new(store::PgStore::new(pool)));

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Subscriber options read from the environment.
///
/// - Color output controlled by TTY detection and `FORCE_COLOR`:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by `AXUM_SPAN_EVENTS`:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level from `RUST_LOG`, else `AXUM_LOG_LEVEL` (default `debug`)
#[derive(Debug, PartialEq)]
struct TracingSettings {
    span_events: FmtSpan,
    use_color: bool,
    /// Filter directive; `None` defers to `RUST_LOG`.
    filter: Option<String>,
}

impl TracingSettings {
    fn from_env() -> Self {
        // ---
        let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
            Ok("full") => FmtSpan::FULL,
            Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
            _ => FmtSpan::CLOSE,
        };

        let use_color = match env::var("FORCE_COLOR").as_deref() {
            Ok("1") | Ok("true") | Ok("yes") => true,
            Ok("0") | Ok("false") | Ok("no") => false,
            _ => std::io::stdout().is_terminal(),
        };

        let filter = if env::var("RUST_LOG").is_ok() {
            None
        } else {
            let level = match env::var("AXUM_LOG_LEVEL").ok().as_deref() {
                Some("trace") => "trace",
                Some("debug") => "debug",
                Some("info") => "info",
                Some("warn") => "warn",
                Some("error") => "error",
                _ => "debug",
            };
            Some(format!("{level},sqlx::query=warn"))
        };

        TracingSettings {
            span_events,
            use_color,
            filter,
        }
    }
}

/// Initialize the global tracing subscriber for structured logging.
///
/// Log target, file, and line number output are always enabled. Call once
/// at startup before any logging macros are invoked.
fn init_tracing(settings: TracingSettings) {
    // ---
    let env_filter = match settings.filter {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::from_default_env(),
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(settings.span_events)
        .with_env_filter(env_filter)
        .with_ansi(settings.use_color)
        .compact()
        .init();
}
