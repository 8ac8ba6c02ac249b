//! Connection tracking, inbound routing, and fan-out to viewers.
//!
//! [`BroadcastHub`] exclusively owns the live connection set and each
//! connection's [`ClientRole`]. Every connection is represented by the
//! sending half of an unbounded channel; the `WebSocket` actor drains the
//! other half into the socket. Fan-out therefore never waits on a slow
//! client.
//!
//! # Routing
//!
//! | Message | Precondition | Effect |
//! |---------|--------------|--------|
//! | `identify` | role unidentified | set role; viewers get `initial_data` |
//! | `ais_data` | role sender | normalize, upsert, broadcast `ship_update`, queue for persistence |
//! | `get_all_ships` | role viewer | reply `all_ships` |
//! | anything else | -- | ignored, no reply |
//!
//! Lock order is always hub then registry. Every outbound event that
//! reflects a registry change is enqueued while the registry lock that made
//! the change is still held, so each viewer sees changes in commit order.
//! Enqueueing never waits, so holding both locks cannot stall on a client.

use std::collections::HashMap;
use std::sync::Arc;

use ais_relay_types::{ClientMessage, ClientRole, ConnectionId, EvictedShip, ServerEvent};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::error::ProtocolError;
use crate::normalizer;
use crate::registry::ShipRegistry;
use crate::sink::PersistQueue;
use crate::stats::RelayStats;

/// A serialized outbound frame, shared across all recipients.
pub type Outbound = Arc<str>;

/// Receiving half handed to the transport for one connection.
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

/// One open client session.
#[derive(Debug)]
struct ClientConnection {
    role: ClientRole,
    tx: mpsc::UnboundedSender<Outbound>,
}

/// Tracks connections and routes messages between them and the registry.
pub struct BroadcastHub {
    connections: RwLock<HashMap<ConnectionId, ClientConnection>>,
    registry: Arc<ShipRegistry>,
    persist: Option<PersistQueue>,
}

impl BroadcastHub {
    /// Create a hub over `registry` with no persistence sink.
    pub fn new(registry: Arc<ShipRegistry>) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            registry,
            persist: None,
        }
    }

    /// Create a hub that also queues every merged record for persistence.
    pub fn with_persistence(registry: Arc<ShipRegistry>, persist: PersistQueue) -> Self {
        Self {
            persist: Some(persist),
            ..Self::new(registry)
        }
    }

    /// The registry this hub routes updates into.
    pub const fn registry(&self) -> &Arc<ShipRegistry> {
        &self.registry
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Register a new, unidentified connection.
    ///
    /// Returns its id and the receiver the transport must drain.
    pub async fn connect(&self) -> (ConnectionId, OutboundReceiver) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.write().await.insert(
            id,
            ClientConnection {
                role: ClientRole::Unidentified,
                tx,
            },
        );
        (id, rx)
    }

    /// Remove a connection from every routing set.
    ///
    /// Returns the role it held, or `None` if it was not registered.
    pub async fn disconnect(&self, id: ConnectionId) -> Option<ClientRole> {
        self.connections
            .write()
            .await
            .remove(&id)
            .map(|conn| conn.role)
    }

    /// Current role of a connection.
    pub async fn role(&self, id: ConnectionId) -> Option<ClientRole> {
        self.connections.read().await.get(&id).map(|conn| conn.role)
    }

    // =========================================================================
    // Inbound routing
    // =========================================================================

    /// Decode and route one inbound text frame.
    ///
    /// Frames that are not JSON are logged and dropped; the connection stays
    /// open and nothing else changes.
    pub async fn handle_frame(&self, id: ConnectionId, text: &str) {
        match parse_frame(text) {
            Ok(message) => self.handle_message(id, message).await,
            Err(e) => warn!(connection_id = %id, error = %e, "Error parsing message"),
        }
    }

    /// Route one decoded message according to the sender's role.
    pub async fn handle_message(&self, id: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::Identify { client_type } => self.identify(id, &client_type).await,
            ClientMessage::AisData { decoded } => {
                if self.role(id).await == Some(ClientRole::Sender) {
                    self.ingest(&decoded).await;
                }
            }
            ClientMessage::GetAllShips => self.reply_all_ships(id).await,
            ClientMessage::Unrecognized => {
                debug!(connection_id = %id, "Ignoring unrecognized message");
            }
        }
    }

    /// Fix the connection's role on its first valid `identify`.
    ///
    /// Viewers receive `initial_data` while the hub lock is held, so every
    /// later `ship_update` is queued behind it and no ship is lost between
    /// the snapshot and the role change.
    async fn identify(&self, id: ConnectionId, client_type: &str) {
        let Some(role) = ClientRole::from_client_type(client_type) else {
            debug!(connection_id = %id, client_type, "Ignoring identify with unknown client type");
            return;
        };

        let mut connections = self.connections.write().await;
        let Some(conn) = connections.get_mut(&id) else {
            return;
        };

        if conn.role != ClientRole::Unidentified {
            debug!(
                connection_id = %id,
                current = %conn.role,
                requested = %role,
                "Ignoring repeated identify"
            );
            return;
        }

        conn.role = role;
        info!(connection_id = %id, %role, "Client identified");

        if role == ClientRole::Viewer {
            let ships = self.registry.snapshot().await;
            let count = ships.len();
            if let Some(payload) = encode(&ServerEvent::initial_data(ships)) {
                let _ = conn.tx.send(payload);
            }
            info!(connection_id = %id, count, "Sent initial data to viewer");
        }
    }

    /// Answer a viewer's `get_all_ships` with the current registry.
    async fn reply_all_ships(&self, id: ConnectionId) {
        let connections = self.connections.read().await;
        let Some(conn) = connections
            .get(&id)
            .filter(|conn| conn.role == ClientRole::Viewer)
        else {
            return;
        };

        self.registry
            .snapshot_with(|ships| {
                if let Some(payload) = encode(&ServerEvent::all_ships(ships)) {
                    let _ = conn.tx.send(payload);
                }
            })
            .await;
    }

    /// Normalize a decoded AIS message, merge it, broadcast the merged
    /// record, and queue it for persistence.
    ///
    /// Returns the number of viewers the update reached, or `None` when the
    /// message had no usable MMSI.
    pub async fn ingest(&self, decoded: &Value) -> Option<usize> {
        let update = normalizer::normalize(decoded)?;
        let mmsi = update.mmsi.clone();
        let fix = update.position.as_ref().map(|p| (p.lat, p.lon, p.speed));

        let connections = self.connections.read().await;
        let mut receivers: usize = 0;
        self.registry
            .upsert_with(update, |record| {
                receivers = fan_out(&connections, &ServerEvent::ship_update(record.clone()));
                if let Some(persist) = &self.persist {
                    if !persist.enqueue(record.clone()) {
                        warn!(mmsi = record.mmsi.as_str(), "Persistence writer stopped, record dropped");
                    }
                }
            })
            .await?;
        drop(connections);

        debug!(mmsi = mmsi.as_str(), receivers, "AIS data broadcast");
        if let Some((lat, lon, speed)) = fix {
            debug!(mmsi = mmsi.as_str(), lat, lon, speed, "Position report");
        }

        Some(receivers)
    }

    /// Remove every ship idle for longer than `timeout` as of `now` and
    /// send one `ship_removed` per ship to every viewer.
    pub async fn evict_stale(&self, now: DateTime<Utc>, timeout: TimeDelta) -> Vec<EvictedShip> {
        let connections = self.connections.read().await;
        self.registry
            .evict_stale_with(now, timeout, |ship| {
                fan_out(&connections, &ServerEvent::ship_removed(ship));
            })
            .await
    }

    // =========================================================================
    // Stats
    // =========================================================================

    /// Counts of tracked ships and connections by role.
    pub async fn stats(&self) -> RelayStats {
        let ships = self.registry.len().await;
        let connections = self.connections.read().await;

        let mut stats = RelayStats {
            ships,
            clients: connections.len(),
            ..RelayStats::default()
        };
        for conn in connections.values() {
            let slot = match conn.role {
                ClientRole::Viewer => &mut stats.viewers,
                ClientRole::Sender => &mut stats.senders,
                ClientRole::Unidentified => &mut stats.unidentified,
            };
            *slot = slot.saturating_add(1);
        }
        stats
    }
}

/// Send `event` to every open viewer in `connections`.
///
/// The event is serialized once. Returns the number of viewers it was
/// actually handed to; senders and unidentified connections never receive
/// broadcasts.
fn fan_out(connections: &HashMap<ConnectionId, ClientConnection>, event: &ServerEvent) -> usize {
    let Some(payload) = encode(event) else {
        return 0;
    };

    let mut delivered: usize = 0;
    for conn in connections
        .values()
        .filter(|conn| conn.role == ClientRole::Viewer)
    {
        if conn.tx.send(Arc::clone(&payload)).is_ok() {
            delivered = delivered.saturating_add(1);
        }
    }
    delivered
}

/// Decode one inbound text frame.
///
/// Only frames that are not JSON are errors. Well-formed JSON that does not
/// match a known message decodes as [`ClientMessage::Unrecognized`].
pub fn parse_frame(text: &str) -> Result<ClientMessage, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    Ok(serde_json::from_value(value).unwrap_or(ClientMessage::Unrecognized))
}

fn encode(event: &ServerEvent) -> Option<Outbound> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            warn!(error = %e, "Failed to serialize server event");
            None
        }
    }
}
