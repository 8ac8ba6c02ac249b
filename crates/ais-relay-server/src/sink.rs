//! Best-effort durable persistence of merged records.
//!
//! A [`ShipSink`] receives a copy of every merged [`ShipRecord`]. Records are
//! handed to a [`PersistQueue`] inside the registry's critical section, so
//! the queue holds them in merge order. A single writer task drains the
//! queue, which keeps durable writes for one MMSI in the same order as the
//! in-memory merges. Enqueueing never waits, so persistence never delays
//! the broadcast to viewers, and a failed write never rolls back the
//! registry. Failures are logged and otherwise dropped.

use std::sync::Arc;

use ais_relay_db::{DbError, ShipStore};
use ais_relay_types::ShipRecord;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Errors reported by a persistence sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The database write failed.
    #[error("database error: {0}")]
    Db(#[from] DbError),
}

/// Durable upsert keyed by MMSI.
pub trait ShipSink: Send + Sync {
    /// Insert or replace the durable copy of `record`.
    fn upsert_durable<'a>(&'a self, record: &'a ShipRecord) -> BoxFuture<'a, Result<(), SinkError>>;
}

/// [`ShipSink`] backed by the `PostgreSQL` [`ShipStore`].
#[derive(Clone)]
pub struct PgShipSink {
    store: ShipStore,
}

impl PgShipSink {
    /// Wrap a ship store.
    pub const fn new(store: ShipStore) -> Self {
        Self { store }
    }
}

impl ShipSink for PgShipSink {
    fn upsert_durable<'a>(&'a self, record: &'a ShipRecord) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            self.store.upsert_ship(record).await?;
            Ok(())
        })
    }
}

/// Ordered hand-off from the hub to a single sink writer.
#[derive(Debug, Clone)]
pub struct PersistQueue {
    tx: mpsc::UnboundedSender<ShipRecord>,
}

impl PersistQueue {
    /// Start the writer task for `sink`.
    ///
    /// The writer runs until every clone of the returned queue is dropped
    /// and the backlog is written, or until the handle is aborted.
    pub fn spawn(sink: Arc<dyn ShipSink>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(drain(sink, rx));
        (Self { tx }, handle)
    }

    /// Queue `record` for writing. Never waits.
    ///
    /// Returns `false` if the writer has stopped.
    pub fn enqueue(&self, record: ShipRecord) -> bool {
        self.tx.send(record).is_ok()
    }
}

async fn drain(sink: Arc<dyn ShipSink>, mut rx: mpsc::UnboundedReceiver<ShipRecord>) {
    while let Some(record) = rx.recv().await {
        match sink.upsert_durable(&record).await {
            Ok(()) => debug!(mmsi = record.mmsi.as_str(), "Persisted ship record"),
            Err(e) => warn!(
                mmsi = record.mmsi.as_str(),
                error = %e,
                "Failed to persist ship record"
            ),
        }
    }
    info!("Persistence writer stopped");
}
