//! Relay configuration loaded from environment variables.
//!
//! There are no command-line flags. Every setting has a default except
//! `DATABASE_URL`, whose absence disables persistence.

use std::time::Duration;

use chrono::TimeDelta;

use crate::error::ConfigError;
use crate::eviction::EvictionSettings;
use crate::server::ServerConfig;
use crate::startup::LogFormat;

/// Default number of pooled database connections.
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Default table holding durable ship records.
const DEFAULT_SHIPS_TABLE: &str = "ships";

/// Durable store settings, present only when `DATABASE_URL` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
    /// `PostgreSQL` connection URL.
    pub database_url: String,
    /// Table holding one row per MMSI.
    pub table: String,
    /// Pool size.
    pub max_connections: u32,
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Listen address.
    pub server: ServerConfig,
    /// Durable store, if configured.
    pub persistence: Option<PersistenceConfig>,
    /// Whether failing to reach the durable store aborts startup.
    pub persistence_required: bool,
    /// Eviction sweep timing.
    pub eviction: EvictionSettings,
    /// Period of the stats heartbeat.
    pub stats_interval: Duration,
    /// Log output format.
    pub log_format: LogFormat,
}

impl RelayConfig {
    /// Load configuration from the process environment.
    ///
    /// Variables (all optional):
    /// - `HOST` -- listen host (default `0.0.0.0`)
    /// - `PORT` -- listen port (default `8080`)
    /// - `DATABASE_URL` -- `PostgreSQL` URL; unset disables persistence
    /// - `SHIPS_TABLE` -- durable table name (default `ships`)
    /// - `PERSISTENCE_REQUIRED` -- abort if the store is unreachable (default `false`)
    /// - `DB_MAX_CONNECTIONS` -- pool size (default `5`)
    /// - `EVICTION_INTERVAL_SECS` -- sweep period (default `120`)
    /// - `STALE_TIMEOUT_SECS` -- idle threshold (default `600`)
    /// - `STATS_INTERVAL_SECS` -- heartbeat period (default `60`)
    /// - `LOG_FORMAT` -- `text` or `json` (default `text`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any value is unparsable or out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any value is unparsable or out of range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();
        let server = ServerConfig {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
        };

        let persistence_required = parse_or(&lookup, "PERSISTENCE_REQUIRED", false)?;
        let table = lookup("SHIPS_TABLE").unwrap_or_else(|| DEFAULT_SHIPS_TABLE.to_owned());
        if !ais_relay_db::is_valid_identifier(&table) {
            return Err(ConfigError::Invalid {
                name: "SHIPS_TABLE",
                message: format!("{table:?} is not a plain SQL identifier"),
            });
        }
        let max_connections = positive(
            "DB_MAX_CONNECTIONS",
            parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
        )?;

        let persistence = match lookup("DATABASE_URL").filter(|url| !url.is_empty()) {
            Some(database_url) => Some(PersistenceConfig {
                database_url,
                table,
                max_connections,
            }),
            None if persistence_required => {
                return Err(ConfigError::Missing {
                    name: "DATABASE_URL",
                    message: "PERSISTENCE_REQUIRED is true".to_owned(),
                });
            }
            None => None,
        };

        let defaults = EvictionSettings::default();
        let interval_secs = positive(
            "EVICTION_INTERVAL_SECS",
            parse_or(&lookup, "EVICTION_INTERVAL_SECS", defaults.interval.as_secs())?,
        )?;
        let stale_secs = positive(
            "STALE_TIMEOUT_SECS",
            parse_or(
                &lookup,
                "STALE_TIMEOUT_SECS",
                defaults.stale_timeout.num_seconds(),
            )?,
        )?;
        let stale_timeout = TimeDelta::try_seconds(stale_secs).ok_or(ConfigError::Invalid {
            name: "STALE_TIMEOUT_SECS",
            message: format!("{stale_secs} is out of range"),
        })?;

        let stats_secs = positive(
            "STATS_INTERVAL_SECS",
            parse_or(&lookup, "STATS_INTERVAL_SECS", 60_u64)?,
        )?;

        let log_format = match lookup("LOG_FORMAT") {
            None => LogFormat::Text,
            Some(raw) => match raw.to_lowercase().as_str() {
                "text" | "" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => {
                    return Err(ConfigError::Invalid {
                        name: "LOG_FORMAT",
                        message: format!("unknown format {other:?} (expected text or json)"),
                    });
                }
            },
        };

        Ok(Self {
            server,
            persistence,
            persistence_required,
            eviction: EvictionSettings {
                interval: Duration::from_secs(interval_secs),
                stale_timeout,
            },
            stats_interval: Duration::from_secs(stats_secs),
            log_format,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name).map_or(Ok(default), |raw| {
        raw.trim().parse().map_err(|e| ConfigError::Invalid {
            name,
            message: format!("{raw:?}: {e}"),
        })
    })
}

fn positive<T>(name: &'static str, value: T) -> Result<T, ConfigError>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            message: format!("must be greater than zero, got {value}"),
        })
    }
}
