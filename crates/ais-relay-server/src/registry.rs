//! Live vessel registry.
//!
//! [`ShipRegistry`] exclusively owns every [`ShipRecord`]. The backing map
//! is never exposed: callers go through [`upsert`](ShipRegistry::upsert),
//! [`snapshot`](ShipRegistry::snapshot), and
//! [`evict_stale`](ShipRegistry::evict_stale).
//!
//! All three run their read-merge-write (or scan-remove) sequence under one
//! lock with no await points inside, so a merge is never observed half
//! applied and a record can be evicted only once. The `_with` variants run
//! a caller hook inside the same critical section, which lets the hub
//! enqueue outbound events in commit order. Contention is low: each
//! critical section is a single map operation plus a field-wise copy.

use std::collections::HashMap;

use ais_relay_types::{EvictedShip, ShipRecord, ShipUpdate};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

/// In-memory mapping from MMSI to canonical record.
#[derive(Debug, Default)]
pub struct ShipRegistry {
    ships: RwLock<HashMap<String, ShipRecord>>,
}

impl ShipRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `update` into the record for its MMSI, stamping `last_update`
    /// with the current time.
    ///
    /// Returns `None` without touching the registry when the MMSI is empty.
    pub async fn upsert(&self, update: ShipUpdate) -> Option<ShipRecord> {
        self.upsert_with(update, |_| {}).await
    }

    /// Like [`upsert`](Self::upsert), calling `on_commit` with the merged
    /// record before the write lock is released.
    ///
    /// The clock is read under the lock, so `last_update` never goes
    /// backwards across successive commits.
    pub async fn upsert_with(
        &self,
        update: ShipUpdate,
        on_commit: impl FnOnce(&ShipRecord),
    ) -> Option<ShipRecord> {
        self.commit(update, Utc::now, on_commit).await
    }

    /// Merge `update` into the record for its MMSI, stamping `last_update`
    /// with `now`.
    ///
    /// Fields present in `update` overwrite the stored values; absent fields
    /// are left untouched. A new record is created on first sight of an
    /// MMSI. Returns a copy of the merged record.
    pub async fn upsert_at(&self, update: ShipUpdate, now: DateTime<Utc>) -> Option<ShipRecord> {
        self.upsert_at_with(update, now, |_| {}).await
    }

    /// Like [`upsert_at`](Self::upsert_at), calling `on_commit` with the
    /// merged record before the write lock is released.
    ///
    /// Anything `on_commit` enqueues is therefore ordered exactly like the
    /// merges themselves. It must not block.
    pub async fn upsert_at_with(
        &self,
        update: ShipUpdate,
        now: DateTime<Utc>,
        on_commit: impl FnOnce(&ShipRecord),
    ) -> Option<ShipRecord> {
        self.commit(update, || now, on_commit).await
    }

    async fn commit(
        &self,
        update: ShipUpdate,
        clock: impl FnOnce() -> DateTime<Utc>,
        on_commit: impl FnOnce(&ShipRecord),
    ) -> Option<ShipRecord> {
        if update.mmsi.is_empty() {
            return None;
        }

        let mut ships = self.ships.write().await;
        let now = clock();
        let record = ships
            .entry(update.mmsi.clone())
            .or_insert_with(|| ShipRecord::new(update.mmsi.clone(), now));
        merge(record, update);
        record.last_update = now;

        on_commit(record);
        Some(record.clone())
    }

    /// Copy of every record at a single point in time. Order is unspecified.
    pub async fn snapshot(&self) -> Vec<ShipRecord> {
        self.snapshot_with(|ships| ships).await
    }

    /// Pass a snapshot to `f` while no merge or eviction can run.
    pub async fn snapshot_with<R>(&self, f: impl FnOnce(Vec<ShipRecord>) -> R) -> R {
        let ships = self.ships.read().await;
        f(ships.values().cloned().collect())
    }

    /// Remove every record idle for longer than `timeout` as of `now`.
    ///
    /// A record is stale when `now - last_update > timeout`. Removed records
    /// are returned; each can be returned only once.
    pub async fn evict_stale(&self, now: DateTime<Utc>, timeout: TimeDelta) -> Vec<EvictedShip> {
        self.evict_stale_with(now, timeout, |_| {}).await
    }

    /// Like [`evict_stale`](Self::evict_stale), calling `on_evict` for each
    /// removed ship before the write lock is released.
    pub async fn evict_stale_with(
        &self,
        now: DateTime<Utc>,
        timeout: TimeDelta,
        mut on_evict: impl FnMut(&EvictedShip),
    ) -> Vec<EvictedShip> {
        let mut ships = self.ships.write().await;

        let stale: Vec<String> = ships
            .iter()
            .filter(|(_, record)| now.signed_duration_since(record.last_update) > timeout)
            .map(|(mmsi, _)| mmsi.clone())
            .collect();

        stale
            .iter()
            .filter_map(|mmsi| ships.remove(mmsi))
            .map(EvictedShip::from)
            .inspect(&mut on_evict)
            .collect()
    }

    /// Copy of the record for one MMSI.
    pub async fn get(&self, mmsi: &str) -> Option<ShipRecord> {
        self.ships.read().await.get(mmsi).cloned()
    }

    /// Number of vessels currently tracked.
    pub async fn len(&self) -> usize {
        self.ships.read().await.len()
    }

    /// Whether no vessels are tracked.
    pub async fn is_empty(&self) -> bool {
        self.ships.read().await.is_empty()
    }
}

/// Field-wise last-write-wins merge.
fn merge(record: &mut ShipRecord, update: ShipUpdate) {
    record.timestamp = update.timestamp;
    overwrite(&mut record.message_type, update.message_type);

    if let Some(position) = update.position {
        record.lat = Some(position.lat);
        record.lon = Some(position.lon);
        record.speed = Some(position.speed);
        record.course = Some(position.course);
        record.heading = Some(position.heading);
        overwrite(&mut record.nav_status, position.nav_status);
    }

    overwrite(&mut record.name, update.name);
    overwrite(&mut record.callsign, update.callsign);
    overwrite(&mut record.ship_type, update.ship_type);
    overwrite(&mut record.destination, update.destination);
    overwrite(&mut record.eta, update.eta);
    overwrite(&mut record.imo, update.imo);
    overwrite(&mut record.draught, update.draught);
    overwrite(&mut record.dimensions, update.dimensions);
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}
