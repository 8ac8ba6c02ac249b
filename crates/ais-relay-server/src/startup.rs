//! Process startup helpers: logging and the durable store connection.

use std::sync::Arc;

use ais_relay_db::{DbError, PostgresConfig, PostgresPool, ShipStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{PersistenceConfig, RelayConfig};
use crate::sink::{PgShipSink, ShipSink};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Install the global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG`, falling back to `info`.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// An open durable store and the sink that writes to it.
pub struct Persistence {
    /// Connection pool, closed on shutdown.
    pub pool: PostgresPool,
    /// Sink handed to the hub.
    pub sink: Arc<dyn ShipSink>,
}

/// Connect to the durable store if one is configured.
///
/// Returns `Ok(None)` when persistence is disabled, or when the store is
/// unreachable and `persistence_required` is false; the relay then runs
/// in memory only.
///
/// # Errors
///
/// Returns [`DbError`] if the store is unreachable and persistence is
/// required.
pub async fn connect_persistence(config: &RelayConfig) -> Result<Option<Persistence>, DbError> {
    let Some(settings) = &config.persistence else {
        info!("DATABASE_URL not set, running without persistence");
        return Ok(None);
    };

    match open_store(settings).await {
        Ok(persistence) => {
            info!(table = settings.table.as_str(), "Persistence enabled");
            Ok(Some(persistence))
        }
        Err(e) if config.persistence_required => Err(e),
        Err(e) => {
            warn!(error = %e, "Durable store unavailable, running without persistence");
            Ok(None)
        }
    }
}

async fn open_store(settings: &PersistenceConfig) -> Result<Persistence, DbError> {
    let pool = PostgresPool::connect(
        &PostgresConfig::new(&settings.database_url)
            .with_max_connections(settings.max_connections),
    )
    .await?;

    let store = ShipStore::new(pool.pool().clone(), &settings.table)?;
    if let Err(e) = store.ensure_schema().await {
        pool.close().await;
        return Err(e);
    }

    Ok(Persistence {
        pool,
        sink: Arc::new(PgShipSink::new(store)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(vars: &[(&str, &str)]) -> RelayConfig {
        RelayConfig::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_owned())
        })
        .unwrap()
    }

    #[tokio::test]
    async fn no_database_url_means_no_persistence() {
        let persistence = connect_persistence(&config(&[])).await.unwrap();
        assert!(persistence.is_none());
    }

    #[tokio::test]
    async fn unreachable_store_is_tolerated_when_optional() {
        let persistence = connect_persistence(&config(&[("DATABASE_URL", "not a url")]))
            .await
            .unwrap();
        assert!(persistence.is_none());
    }

    #[tokio::test]
    async fn unreachable_store_is_fatal_when_required() {
        let result = connect_persistence(&config(&[
            ("DATABASE_URL", "not a url"),
            ("PERSISTENCE_REQUIRED", "true"),
        ]))
        .await;
        assert!(result.is_err());
    }
}
