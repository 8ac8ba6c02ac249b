//! AIS relay entry point.
//!
//! Loads configuration from the environment, connects the optional durable
//! store, starts the eviction and stats tasks, and serves `WebSocket` clients
//! until `Ctrl-C` or `SIGTERM`.

use std::sync::Arc;

use ais_relay_server::config::RelayConfig;
use ais_relay_server::eviction::spawn_eviction_task;
use ais_relay_server::startup::{Persistence, connect_persistence, init_tracing};
use ais_relay_server::stats::spawn_stats_task;
use ais_relay_server::{
    AppState, BroadcastHub, PersistQueue, ShipRegistry, shutdown_signal, start_server,
};
use tracing::info;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, a required durable store
/// is unreachable, or the listener cannot bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RelayConfig::from_env()?;
    init_tracing(config.log_format);

    info!("ais-relay v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        host = config.server.host.as_str(),
        port = config.server.port,
        persistence = config.persistence.is_some(),
        eviction_interval_secs = config.eviction.interval.as_secs(),
        stale_timeout_secs = config.eviction.stale_timeout.num_seconds(),
        "configuration loaded"
    );

    let persistence = connect_persistence(&config).await?;

    let registry = Arc::new(ShipRegistry::new());
    let (hub, writer_handle) = match &persistence {
        Some(Persistence { sink, .. }) => {
            let (queue, writer) = PersistQueue::spawn(Arc::clone(sink));
            (
                BroadcastHub::with_persistence(Arc::clone(&registry), queue),
                Some(writer),
            )
        }
        None => (BroadcastHub::new(Arc::clone(&registry)), None),
    };
    let hub = Arc::new(hub);

    let eviction_handle = spawn_eviction_task(Arc::clone(&hub), config.eviction);
    let stats_handle = spawn_stats_task(Arc::clone(&hub), config.stats_interval);

    let result = start_server(&config.server, AppState::new(hub), shutdown_signal()).await;

    eviction_handle.abort();
    stats_handle.abort();
    info!(ships = registry.len().await, "Shutting down");

    if let Some(writer) = writer_handle {
        writer.abort();
    }
    if let Some(persistence) = persistence {
        persistence.pool.close().await;
        info!("Durable store connection closed");
    }

    result?;
    info!("ais-relay stopped");
    Ok(())
}
