//! Configuration loader for the `silo-monitor` backend service.
//!
//! All runtime settings are read from environment variables here (with
//! optional `.env` support provided by the caller), so the rest of the
//! service never touches `env::var` directly.
//!
use std::env;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 3000;

/// Strongly typed application configuration.
///
/// All fields are immutable after loading.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// TCP port the HTTP listener binds on all interfaces.
    pub port: u16,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `PORT` – HTTP listen port (default: 3000)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let db_pool_max = parse_env!("DB_POOL_MAX", u32, 5);
    let port = parse_env!("PORT", u16, DEFAULT_PORT);

    Ok(Config {
        db_url,
        db_pool_max,
        port,
    })
}

impl Config {
    /// Log the loaded configuration, masking the database password.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL : {}", self.masked_db_url());
        tracing::info!("  DB_POOL_MAX  : {}", self.db_pool_max);
        tracing::info!("  PORT         : {}", self.port);
    }

    /// The database URL with the password segment replaced by `****`.
    pub fn masked_db_url(&self) -> String {
        // ---
        let Some(at_pos) = self.db_url.rfind('@') else {
            return self.db_url.clone();
        };
        match self.db_url[..at_pos].rfind(':') {
            // `postgres://user@host` has its only colon in the scheme
            Some(colon_pos) if !self.db_url[colon_pos..].starts_with("://") => format!(
                "{}:****{}",
                &self.db_url[..colon_pos],
                &self.db_url[at_pos..]
            ),
            _ => self.db_url.clone(),
        }
    }
}
