//! Vessel state types.
//!
//! A [`ShipRecord`] is the canonical per-vessel aggregate kept by the relay's
//! registry and sent to viewers. A [`ShipUpdate`] is the partial record that
//! one decoded AIS message contributes; the registry merges updates into
//! records field by field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// AisCode
// ---------------------------------------------------------------------------

/// A coded AIS value that decoders report either as a number or as text.
///
/// Used for navigation status, ship type, and IMO number. Decoders disagree
/// on the representation, so both are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum AisCode {
    /// Numeric code (e.g. navigation status `0`, ship type `70`).
    Number(u32),
    /// Textual code or label (e.g. `"Under way using engine"`).
    Text(String),
}

impl From<u32> for AisCode {
    fn from(value: u32) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for AisCode {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// Hull dimensions relative to the AIS antenna, in metres.
///
/// `length` and `width` are always derived from the four offsets and cannot
/// be set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Dimensions {
    bow: u32,
    stern: u32,
    port: u32,
    starboard: u32,
    length: u32,
    width: u32,
}

impl Dimensions {
    /// Build dimensions from the four antenna offsets.
    pub const fn from_offsets(bow: u32, stern: u32, port: u32, starboard: u32) -> Self {
        Self {
            bow,
            stern,
            port,
            starboard,
            length: bow.saturating_add(stern),
            width: port.saturating_add(starboard),
        }
    }

    /// Distance from the antenna to the bow.
    pub const fn bow(&self) -> u32 {
        self.bow
    }

    /// Distance from the antenna to the stern.
    pub const fn stern(&self) -> u32 {
        self.stern
    }

    /// Distance from the antenna to the port side.
    pub const fn port(&self) -> u32 {
        self.port
    }

    /// Distance from the antenna to the starboard side.
    pub const fn starboard(&self) -> u32 {
        self.starboard
    }

    /// Overall length (`bow + stern`).
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Overall beam (`port + starboard`).
    pub const fn width(&self) -> u32 {
        self.width
    }
}

// ---------------------------------------------------------------------------
// ShipRecord
// ---------------------------------------------------------------------------

/// Canonical live state of one vessel, keyed by MMSI.
///
/// Built by merging every accepted message for the MMSI. Optional fields are
/// omitted from the JSON form until some message has supplied them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ShipRecord {
    /// Maritime Mobile Service Identity. Never changes once assigned.
    pub mmsi: String,
    /// When the registry last merged a message into this record.
    pub last_update: DateTime<Utc>,
    /// When the most recent contributing message was normalized.
    pub timestamp: DateTime<Utc>,
    /// AIS message type of the most recent message that carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<u32>,
    /// Latitude in decimal degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude in decimal degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    /// Speed over ground in knots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Course over ground in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<f64>,
    /// True heading in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// Navigation status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_status: Option<AisCode>,
    /// Vessel name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Radio call sign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
    /// Ship and cargo type code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ship_type: Option<AisCode>,
    /// Reported destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Estimated time of arrival, `MM-DD HH:MM` or decoder-supplied text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
    /// IMO ship identification number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imo: Option<AisCode>,
    /// Maximum present static draught in metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draught: Option<f64>,
    /// Hull dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

impl ShipRecord {
    /// Create an empty record seeded with only the MMSI.
    pub const fn new(mmsi: String, now: DateTime<Utc>) -> Self {
        Self {
            mmsi,
            last_update: now,
            timestamp: now,
            message_type: None,
            lat: None,
            lon: None,
            speed: None,
            course: None,
            heading: None,
            nav_status: None,
            name: None,
            callsign: None,
            ship_type: None,
            destination: None,
            eta: None,
            imo: None,
            draught: None,
            dimensions: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ShipUpdate
// ---------------------------------------------------------------------------

/// Position group of a partial update.
///
/// Present only when the message carried both latitude and longitude.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionReport {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Speed over ground in knots (`0` when the message carried none).
    pub speed: f64,
    /// Course over ground in degrees (`0` when the message carried none).
    pub course: f64,
    /// True heading in degrees (`0` when the message carried none).
    pub heading: f64,
    /// Navigation status; has no default.
    pub nav_status: Option<AisCode>,
}

/// Partial vessel record produced from one decoded AIS message.
///
/// `None` means "this message said nothing about the field" and leaves the
/// registry's prior value untouched on merge.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipUpdate {
    /// MMSI of the reporting vessel.
    pub mmsi: String,
    /// When the message was normalized.
    pub timestamp: DateTime<Utc>,
    /// AIS message type.
    pub message_type: Option<u32>,
    /// Position group.
    pub position: Option<PositionReport>,
    /// Vessel name, trimmed.
    pub name: Option<String>,
    /// Call sign, trimmed.
    pub callsign: Option<String>,
    /// Ship and cargo type code.
    pub ship_type: Option<AisCode>,
    /// Destination, trimmed.
    pub destination: Option<String>,
    /// Estimated time of arrival.
    pub eta: Option<String>,
    /// IMO number.
    pub imo: Option<AisCode>,
    /// Draught in metres.
    pub draught: Option<f64>,
    /// Hull dimensions.
    pub dimensions: Option<Dimensions>,
}

impl ShipUpdate {
    /// An update for `mmsi` that carries no fields besides its timestamp.
    pub const fn empty(mmsi: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            mmsi,
            timestamp,
            message_type: None,
            position: None,
            name: None,
            callsign: None,
            ship_type: None,
            destination: None,
            eta: None,
            imo: None,
            draught: None,
            dimensions: None,
        }
    }
}

// ---------------------------------------------------------------------------
// EvictedShip
// ---------------------------------------------------------------------------

/// A vessel removed from the registry by the eviction sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictedShip {
    /// MMSI of the removed vessel.
    pub mmsi: String,
    /// Last known name, if any message ever supplied one.
    pub name: Option<String>,
    /// When the vessel was last updated.
    pub last_update: DateTime<Utc>,
}

impl EvictedShip {
    /// Display name for logs, `Unknown` when the vessel never reported one.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

impl From<ShipRecord> for EvictedShip {
    fn from(record: ShipRecord) -> Self {
        Self {
            mmsi: record.mmsi,
            name: record.name,
            last_update: record.last_update,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_derive_length_and_width() {
        let dims = Dimensions::from_offsets(10, 5, 3, 4);
        assert_eq!(dims.length(), 15);
        assert_eq!(dims.width(), 7);
        assert_eq!(dims.bow(), 10);
        assert_eq!(dims.starboard(), 4);
    }

    #[test]
    fn dimensions_saturate_instead_of_overflowing() {
        let dims = Dimensions::from_offsets(u32::MAX, 1, 0, 0);
        assert_eq!(dims.length(), u32::MAX);
    }

    #[test]
    fn empty_record_serializes_only_required_fields() {
        let now = Utc::now();
        let record = ShipRecord::new("123456789".to_owned(), now);
        let json = serde_json::to_value(&record).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(json["mmsi"], "123456789");
        assert!(obj.contains_key("lastUpdate"));
        assert!(obj.contains_key("timestamp"));
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let now = Utc::now();
        let mut record = ShipRecord::new("1".to_owned(), now);
        record.nav_status = Some(AisCode::Number(5));
        record.ship_type = Some(AisCode::from("Cargo"));
        record.message_type = Some(1);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["navStatus"], 5);
        assert_eq!(json["shipType"], "Cargo");
        assert_eq!(json["messageType"], 1);
    }

    #[test]
    fn record_deserializes_from_its_json_form() {
        let now = Utc::now();
        let mut record = ShipRecord::new("987654321".to_owned(), now);
        record.lat = Some(1.5);
        record.lon = Some(2.5);
        record.dimensions = Some(Dimensions::from_offsets(1, 2, 3, 4));
        let json = serde_json::to_string(&record).unwrap();
        let back: ShipRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn evicted_display_name_defaults_to_unknown() {
        let ship = EvictedShip {
            mmsi: "1".to_owned(),
            name: None,
            last_update: Utc::now(),
        };
        assert_eq!(ship.display_name(), "Unknown");
    }
}
