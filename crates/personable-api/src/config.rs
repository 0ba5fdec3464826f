//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `postgres://localhost/personable` |
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `3000` |
//! | `STORAGE_BACKEND` | `postgres` (`postgres` or `memory`) |
//! | `LEADS_COLLECTION` / `CONTACTS_COLLECTION` / `USERS_COLLECTION` | `leads` / `contacts` / `users` |
//! | `DB_MAX_CONNECTIONS` / `DB_MIN_CONNECTIONS` / `DB_ACQUIRE_TIMEOUT_SECS` / `DB_IDLE_TIMEOUT_SECS` | see [`personable_db::pool`] |
//! | `RECONCILE_INTERVAL_SECS` | `300` (`0` disables the sweep) |
//! | `RECONCILE_AFTER_SECS` | `600` |
//! | `ALLOWED_ORIGINS` | empty (comma-separated list) |

use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use personable_core::{Error, Result};
use personable_db::settings::{
    DEFAULT_CONTACTS_COLLECTION, DEFAULT_LEADS_COLLECTION, DEFAULT_USERS_COLLECTION,
};
use personable_db::{CollectionSettings, PoolConfig};

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/personable";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_RECONCILE_AFTER_SECS: u64 = 600;

/// Where records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// In-process collections; contents are lost on exit.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(Error::Config(format!(
                "STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub backend: StorageBackend,
    pub collections: CollectionSettings,
    pub pool: PoolConfig,
    /// Interval between reconciliation sweeps; `None` when disabled.
    pub reconcile_interval: Option<Duration>,
    /// Age a pending conversion must reach before a sweep repairs it.
    pub reconcile_after: Duration,
    pub allowed_origins: Vec<HeaderValue>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let collections = CollectionSettings {
            leads: text("LEADS_COLLECTION", DEFAULT_LEADS_COLLECTION),
            contacts: text("CONTACTS_COLLECTION", DEFAULT_CONTACTS_COLLECTION),
            users: text("USERS_COLLECTION", DEFAULT_USERS_COLLECTION),
        };
        collections.validate()?;

        let interval_secs: u64 =
            parse(&lookup, "RECONCILE_INTERVAL_SECS", DEFAULT_RECONCILE_INTERVAL_SECS)?;
        let after_secs: u64 = parse(&lookup, "RECONCILE_AFTER_SECS", DEFAULT_RECONCILE_AFTER_SECS)?;

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| Error::Config(format!("invalid origin in ALLOWED_ORIGINS: {}", origin)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            database_url: text("DATABASE_URL", DEFAULT_DATABASE_URL),
            host: text("HOST", DEFAULT_HOST),
            port: parse(&lookup, "PORT", DEFAULT_PORT)?,
            backend: text("STORAGE_BACKEND", "postgres").parse()?,
            collections,
            pool: PoolConfig::from_lookup(&lookup)?,
            reconcile_interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
            reconcile_after: Duration::from_secs(after_secs),
            allowed_origins,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: '{}'", key, raw))),
    }
}
