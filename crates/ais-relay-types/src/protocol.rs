//! JSON wire protocol between the relay and its clients.
//!
//! All frames are UTF-8 JSON text objects discriminated by a `type` field.
//!
//! | Direction | `type` | Payload |
//! |-----------|--------|---------|
//! | in | `identify` | `clientType`: `sender` or `viewer` |
//! | in | `ais_data` | `decoded`: raw decoder fields (senders only) |
//! | in | `get_all_ships` | none (viewers only) |
//! | out | `initial_data` | `ships`, `count` |
//! | out | `ship_update` | `ship` |
//! | out | `all_ships` | `ships`, `count` |
//! | out | `ship_removed` | `mmsi`, `reason`, `lastUpdate` |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::RemovalReason;
use crate::ship::{EvictedShip, ShipRecord};

/// A message sent by a client to the relay.
///
/// Any well-formed JSON object whose `type` is not one of the known values
/// (or whose shape does not match) decodes as
/// [`Unrecognized`](ClientMessage::Unrecognized).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Declare the connection's role.
    Identify {
        /// `sender` or `viewer`; other values are ignored.
        #[serde(rename = "clientType", default)]
        client_type: String,
    },
    /// A decoded AIS message from a sender.
    AisData {
        /// Raw decoder output; heterogeneous field names.
        #[serde(default)]
        decoded: serde_json::Value,
    },
    /// Request the full current vessel list.
    GetAllShips,
    /// Anything the relay does not act on.
    #[serde(other)]
    Unrecognized,
}

/// An event sent by the relay to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerEvent {
    /// Reply to a viewer's `identify`: the registry as of identification.
    InitialData {
        /// Every vessel currently tracked.
        ships: Vec<ShipRecord>,
        /// `ships.len()`.
        count: usize,
    },
    /// Broadcast after every accepted AIS message.
    ShipUpdate {
        /// The merged record.
        ship: Box<ShipRecord>,
    },
    /// Reply to a viewer's `get_all_ships`.
    AllShips {
        /// Every vessel currently tracked.
        ships: Vec<ShipRecord>,
        /// `ships.len()`.
        count: usize,
    },
    /// Broadcast once per vessel dropped by the eviction sweep.
    ShipRemoved {
        /// MMSI of the removed vessel.
        mmsi: String,
        /// Why it was removed.
        reason: RemovalReason,
        /// When the vessel was last updated.
        #[serde(rename = "lastUpdate")]
        last_update: DateTime<Utc>,
    },
}

impl ServerEvent {
    /// Build an `initial_data` reply from a registry snapshot.
    pub fn initial_data(ships: Vec<ShipRecord>) -> Self {
        let count = ships.len();
        Self::InitialData { ships, count }
    }

    /// Build an `all_ships` reply from a registry snapshot.
    pub fn all_ships(ships: Vec<ShipRecord>) -> Self {
        let count = ships.len();
        Self::AllShips { ships, count }
    }

    /// Build a `ship_update` broadcast.
    pub fn ship_update(ship: ShipRecord) -> Self {
        Self::ShipUpdate {
            ship: Box::new(ship),
        }
    }

    /// Build the `ship_removed` broadcast for an evicted vessel.
    pub fn ship_removed(evicted: &EvictedShip) -> Self {
        Self::ShipRemoved {
            mmsi: evicted.mmsi.clone(),
            reason: RemovalReason::Inactive,
            last_update: evicted.last_update,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn identify_decodes_client_type() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "identify", "clientType": "viewer"})).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Identify {
                client_type: "viewer".to_owned()
            }
        );
    }

    #[test]
    fn ais_data_without_decoded_is_null() {
        let msg: ClientMessage = serde_json::from_value(json!({"type": "ais_data"})).unwrap();
        assert_eq!(
            msg,
            ClientMessage::AisData {
                decoded: serde_json::Value::Null
            }
        );
    }

    #[test]
    fn unknown_type_is_unrecognized() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "subscribe", "topic": "x"})).unwrap();
        assert_eq!(msg, ClientMessage::Unrecognized);
    }

    #[test]
    fn ship_removed_wire_shape() {
        let now = Utc::now();
        let event = ServerEvent::ship_removed(&EvictedShip {
            mmsi: "244660000".to_owned(),
            name: Some("ALPHA".to_owned()),
            last_update: now,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "ship_removed");
        assert_eq!(value["mmsi"], "244660000");
        assert_eq!(value["reason"], "inactive");
        assert!(value.get("lastUpdate").is_some());
        assert!(value.get("name").is_none());
    }

    #[test]
    fn snapshot_events_carry_count() {
        let now = Utc::now();
        let ships = vec![
            ShipRecord::new("1".to_owned(), now),
            ShipRecord::new("2".to_owned(), now),
        ];
        let value = serde_json::to_value(ServerEvent::initial_data(ships)).unwrap();
        assert_eq!(value["type"], "initial_data");
        assert_eq!(value["count"], 2);
        assert_eq!(value["ships"].as_array().map(Vec::len), Some(2));

        let value = serde_json::to_value(ServerEvent::all_ships(Vec::new())).unwrap();
        assert_eq!(value["type"], "all_ships");
        assert_eq!(value["count"], 0);
    }

    #[test]
    fn ship_update_is_flat_record_under_ship() {
        let record = ShipRecord::new("42".to_owned(), Utc::now());
        let value = serde_json::to_value(ServerEvent::ship_update(record)).unwrap();
        assert_eq!(value["type"], "ship_update");
        assert_eq!(value["ship"]["mmsi"], "42");
    }
}
