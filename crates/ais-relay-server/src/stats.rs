//! Periodic relay heartbeat.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::hub::BroadcastHub;

/// Point-in-time counts of tracked ships and connected clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// Vessels currently in the registry.
    pub ships: usize,
    /// Open connections of any role.
    pub clients: usize,
    /// Connections identified as viewers.
    pub viewers: usize,
    /// Connections identified as senders.
    pub senders: usize,
    /// Connections that have not identified yet.
    pub unidentified: usize,
}

/// Log [`RelayStats`] every `period`.
///
/// The first heartbeat is emitted one full period after startup.
pub fn spawn_stats_task(hub: Arc<BroadcastHub>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let stats = hub.stats().await;
            info!(
                ships = stats.ships,
                clients = stats.clients,
                viewers = stats.viewers,
                senders = stats.senders,
                unidentified = stats.unidentified,
                "Relay stats"
            );
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::ShipRegistry;

    #[test]
    fn stats_serialize_flat() {
        let stats = RelayStats {
            ships: 3,
            clients: 2,
            viewers: 1,
            senders: 1,
            unidentified: 0,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["ships"], 3);
        assert_eq!(json["viewers"], 1);
        assert_eq!(json["unidentified"], 0);
    }

    #[tokio::test]
    async fn stats_task_runs_until_aborted() {
        let hub = Arc::new(BroadcastHub::new(Arc::new(ShipRegistry::new())));
        let handle = spawn_stats_task(hub, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
