//! Periodic removal of idle vessels.
//!
//! Every sweep removes each record whose `last_update` is older than the
//! stale timeout and sends one `ship_removed` event per removed ship to all
//! viewers. Removal and notification happen under the hub lock, so a sweep
//! cannot interleave with a concurrent update for the same ship. Eviction
//! does not touch the durable store.

use std::sync::Arc;
use std::time::Duration;

use ais_relay_types::EvictedShip;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::hub::BroadcastHub;

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(120);

/// Default idle time after which a ship is evicted.
pub const DEFAULT_STALE_TIMEOUT: TimeDelta = TimeDelta::minutes(10);

/// Sweep timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionSettings {
    /// Time between sweeps.
    pub interval: Duration,
    /// A ship idle for strictly longer than this is evicted.
    pub stale_timeout: TimeDelta,
}

impl Default for EvictionSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
            stale_timeout: DEFAULT_STALE_TIMEOUT,
        }
    }
}

/// Run one sweep as of `now` and notify viewers of every removal.
///
/// Returns the ships that were removed.
pub async fn run_sweep(
    hub: &BroadcastHub,
    now: DateTime<Utc>,
    stale_timeout: TimeDelta,
) -> Vec<EvictedShip> {
    let evicted = hub.evict_stale(now, stale_timeout).await;
    if evicted.is_empty() {
        debug!("Eviction sweep found no stale ships");
        return evicted;
    }

    info!(count = evicted.len(), "Evicting stale ships");
    for ship in &evicted {
        info!(
            mmsi = ship.mmsi.as_str(),
            name = ship.display_name(),
            last_update = %ship.last_update,
            "Removed inactive ship"
        );
    }

    evicted
}

/// Sweep every `settings.interval` until the task is aborted.
///
/// The first sweep happens one full interval after startup.
pub fn spawn_eviction_task(hub: Arc<BroadcastHub>, settings: EvictionSettings) -> JoinHandle<()> {
    info!(
        interval_secs = settings.interval.as_secs(),
        stale_timeout_secs = settings.stale_timeout.num_seconds(),
        "Eviction task started"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            run_sweep(&hub, Utc::now(), settings.stale_timeout).await;
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use ais_relay_types::ShipUpdate;
    use serde_json::Value;

    use super::*;
    use crate::registry::ShipRegistry;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_770_000_000 + secs, 0).unwrap()
    }

    async fn seeded_hub() -> BroadcastHub {
        let registry = Arc::new(ShipRegistry::new());
        let mut ghost = ShipUpdate::empty("111".to_owned(), at(0));
        ghost.name = Some("GHOST".to_owned());
        registry.upsert_at(ghost, at(0)).await;
        registry
            .upsert_at(ShipUpdate::empty("222".to_owned(), at(0)), at(0))
            .await;
        registry
            .upsert_at(ShipUpdate::empty("333".to_owned(), at(550)), at(550))
            .await;
        BroadcastHub::new(registry)
    }

    #[test]
    fn default_settings() {
        let settings = EvictionSettings::default();
        assert_eq!(settings.interval, Duration::from_secs(120));
        assert_eq!(settings.stale_timeout, TimeDelta::seconds(600));
    }

    #[tokio::test]
    async fn sweep_removes_stale_and_notifies_viewers() {
        let hub = seeded_hub().await;
        let (viewer, mut rx) = hub.connect().await;
        hub.handle_frame(viewer, r#"{"type":"identify","clientType":"viewer"}"#)
            .await;
        let _initial = rx.try_recv().unwrap();

        let evicted = run_sweep(&hub, at(700), DEFAULT_STALE_TIMEOUT).await;
        assert_eq!(evicted.len(), 2);
        assert_eq!(hub.registry().len().await, 1);
        assert!(hub.registry().get("333").await.is_some());

        let mut removed = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            let event: Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(event["type"], "ship_removed");
            assert_eq!(event["reason"], "inactive");
            assert!(event["lastUpdate"].is_string());
            removed.push(event["mmsi"].as_str().unwrap().to_owned());
        }
        removed.sort();
        assert_eq!(removed, vec!["111", "222"]);
    }

    #[tokio::test]
    async fn sweep_does_not_notify_senders() {
        let hub = seeded_hub().await;
        let (sender, mut rx) = hub.connect().await;
        hub.handle_frame(sender, r#"{"type":"identify","clientType":"sender"}"#)
            .await;

        run_sweep(&hub, at(700), DEFAULT_STALE_TIMEOUT).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn sweep_with_nothing_stale_is_silent() {
        let hub = seeded_hub().await;
        let evicted = run_sweep(&hub, at(100), DEFAULT_STALE_TIMEOUT).await;
        assert!(evicted.is_empty());
        assert_eq!(hub.registry().len().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn task_sweeps_on_interval() {
        let registry = Arc::new(ShipRegistry::new());
        registry
            .upsert_at(
                ShipUpdate::empty("1".to_owned(), at(0)),
                Utc::now().checked_sub_signed(TimeDelta::hours(1)).unwrap(),
            )
            .await;
        let hub = Arc::new(BroadcastHub::new(Arc::clone(&registry)));

        let handle = spawn_eviction_task(
            hub,
            EvictionSettings {
                interval: Duration::from_secs(1),
                stale_timeout: TimeDelta::minutes(10),
            },
        );
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(registry.is_empty().await);
        handle.abort();
    }
}
