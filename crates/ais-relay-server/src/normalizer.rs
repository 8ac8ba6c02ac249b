//! Decoded-AIS normalization.
//!
//! Different AIS decoders name the same quantity differently (`speed` vs
//! `sog`, `shipname` vs `name`, `to_bow` vs `dimBow`, ...). [`normalize`]
//! maps one decoded message onto a canonical [`ShipUpdate`] by consulting
//! the alias table below: for each canonical field, keys are tried in
//! priority order and the first usable value wins.
//!
//! A key is usable when it is present, not `null`, and converts to the
//! field's type. Numeric strings are accepted for numeric fields; strings are
//! trimmed and must be non-empty.
//!
//! | Canonical | Keys (priority order) | Default |
//! |-----------|-----------------------|---------|
//! | `messageType` | `type`, `aisType` | none |
//! | `speed` | `speed`, `sog` | `0` |
//! | `course` | `course`, `cog` | `0` |
//! | `heading` | `heading`, `trueHeading` | `0` |
//! | `navStatus` | `status`, `navStatus`, `navigationStatus` | none |
//! | `name` | `shipname`, `name` | none |
//! | `shipType` | `shiptype`, `shipType` | none |
//! | `dimensions.bow` | `to_bow`, `dimBow` | `0` |
//! | `dimensions.stern` | `to_stern`, `dimStern` | `0` |
//! | `dimensions.port` | `to_port`, `dimPort` | `0` |
//! | `dimensions.starboard` | `to_starboard`, `dimStarboard` | `0` |

use ais_relay_types::{AisCode, Dimensions, PositionReport, ShipUpdate};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Alias table
// ---------------------------------------------------------------------------

/// One row of the alias-resolution table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alias {
    /// Canonical field name (as serialized on [`ShipRecord`](ais_relay_types::ShipRecord)).
    pub canonical: &'static str,
    /// Decoder keys in priority order.
    pub keys: &'static [&'static str],
    /// Value used when no key resolves; `None` leaves the field absent.
    pub default: Option<f64>,
}

/// AIS message type.
pub const MESSAGE_TYPE: Alias = Alias {
    canonical: "messageType",
    keys: &["type", "aisType"],
    default: None,
};

/// Speed over ground.
pub const SPEED: Alias = Alias {
    canonical: "speed",
    keys: &["speed", "sog"],
    default: Some(0.0),
};

/// Course over ground.
pub const COURSE: Alias = Alias {
    canonical: "course",
    keys: &["course", "cog"],
    default: Some(0.0),
};

/// True heading.
pub const HEADING: Alias = Alias {
    canonical: "heading",
    keys: &["heading", "trueHeading"],
    default: Some(0.0),
};

/// Navigation status.
pub const NAV_STATUS: Alias = Alias {
    canonical: "navStatus",
    keys: &["status", "navStatus", "navigationStatus"],
    default: None,
};

/// Vessel name.
pub const NAME: Alias = Alias {
    canonical: "name",
    keys: &["shipname", "name"],
    default: None,
};

/// Ship and cargo type.
pub const SHIP_TYPE: Alias = Alias {
    canonical: "shipType",
    keys: &["shiptype", "shipType"],
    default: None,
};

/// Antenna-to-bow offset.
pub const DIM_BOW: Alias = Alias {
    canonical: "dimensions.bow",
    keys: &["to_bow", "dimBow"],
    default: Some(0.0),
};

/// Antenna-to-stern offset.
pub const DIM_STERN: Alias = Alias {
    canonical: "dimensions.stern",
    keys: &["to_stern", "dimStern"],
    default: Some(0.0),
};

/// Antenna-to-port offset.
pub const DIM_PORT: Alias = Alias {
    canonical: "dimensions.port",
    keys: &["to_port", "dimPort"],
    default: Some(0.0),
};

/// Antenna-to-starboard offset.
pub const DIM_STARBOARD: Alias = Alias {
    canonical: "dimensions.starboard",
    keys: &["to_starboard", "dimStarboard"],
    default: Some(0.0),
};

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize a decoded AIS message, stamping it with the current time.
///
/// Returns `None` if and only if `mmsi` is missing or falsy (`null`, `0`,
/// `""`, `false`) or `raw` is not a JSON object.
pub fn normalize(raw: &Value) -> Option<ShipUpdate> {
    normalize_at(raw, Utc::now())
}

/// Normalize a decoded AIS message with an explicit timestamp.
///
/// Pure: the same `raw` and `now` always produce the same result.
pub fn normalize_at(raw: &Value, now: DateTime<Utc>) -> Option<ShipUpdate> {
    let fields = raw.as_object()?;
    let mmsi = mmsi_key(fields.get("mmsi")?)?;

    let mut update = ShipUpdate::empty(mmsi, now);
    update.message_type = resolve(fields, &MESSAGE_TYPE, as_u32);
    update.position = position(fields);

    update.name = resolve(fields, &NAME, as_text);
    update.callsign = fields.get("callsign").and_then(as_text);
    update.destination = fields.get("destination").and_then(as_text);
    update.ship_type = resolve(fields, &SHIP_TYPE, as_code);

    update.eta = eta(fields);
    update.dimensions = dimensions(fields);
    update.imo = fields.get("imo").and_then(as_code);
    update.draught = fields.get("draught").and_then(as_f64);

    Some(update)
}

/// Canonical MMSI string, or `None` when the value is falsy.
///
/// Integral numbers map to their integer digits whether they arrive as
/// `244660000` or `244660000.0`, so both forms key the same vessel.
fn mmsi_key(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f == 0.0) => None,
        Value::Number(n) => Some(number_key(n)),
        other => Some(other.to_string()),
    }
}

fn number_key(n: &serde_json::Number) -> String {
    if n.is_u64() || n.is_i64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.0}"),
        _ => n.to_string(),
    }
}

/// First usable value for `alias`, converted by `convert`.
fn resolve<T>(
    fields: &Map<String, Value>,
    alias: &Alias,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    alias
        .keys
        .iter()
        .find_map(|key| fields.get(*key).and_then(&convert))
}

/// First usable numeric value for `alias`, falling back to its default.
fn resolve_number(fields: &Map<String, Value>, alias: &Alias) -> Option<f64> {
    resolve(fields, alias, as_f64).or(alias.default)
}

/// Position group: only when both latitude and longitude are usable.
fn position(fields: &Map<String, Value>) -> Option<PositionReport> {
    let lat = fields.get("lat").and_then(as_f64)?;
    let lon = fields.get("lon").and_then(as_f64)?;

    Some(PositionReport {
        lat,
        lon,
        speed: resolve_number(fields, &SPEED).unwrap_or_default(),
        course: resolve_number(fields, &COURSE).unwrap_or_default(),
        heading: resolve_number(fields, &HEADING).unwrap_or_default(),
        nav_status: resolve(fields, &NAV_STATUS, as_code),
    })
}

/// ETA from discrete components, else the decoder's own `eta` string.
///
/// Month and day must be non-zero (AIS uses `0` for "not available");
/// hour and minute only need to be present.
fn eta(fields: &Map<String, Value>) -> Option<String> {
    let component = |key: &str| fields.get(key).and_then(as_u32);

    let month = component("eta_month").filter(|m| *m != 0);
    let day = component("eta_day").filter(|d| *d != 0);
    let hour = component("eta_hour");
    let minute = component("eta_minute");

    if let (Some(month), Some(day), Some(hour), Some(minute)) = (month, day, hour, minute) {
        return Some(format!("{month:02}-{day:02} {hour:02}:{minute:02}"));
    }

    match fields.get("eta") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Dimensions when at least one offset alias resolves; missing offsets are 0.
fn dimensions(fields: &Map<String, Value>) -> Option<Dimensions> {
    let bow = resolve(fields, &DIM_BOW, as_u32);
    let stern = resolve(fields, &DIM_STERN, as_u32);
    let port = resolve(fields, &DIM_PORT, as_u32);
    let starboard = resolve(fields, &DIM_STARBOARD, as_u32);

    if bow.is_none() && stern.is_none() && port.is_none() && starboard.is_none() {
        return None;
    }

    Some(Dimensions::from_offsets(
        bow.unwrap_or_default(),
        stern.unwrap_or_default(),
        port.unwrap_or_default(),
        starboard.unwrap_or_default(),
    ))
}

// ---------------------------------------------------------------------------
// Value conversions
// ---------------------------------------------------------------------------

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        _ => None,
    }
}

fn as_code(value: &Value) -> Option<AisCode> {
    match value {
        Value::Number(n) => Some(
            n.as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map_or_else(|| AisCode::Text(n.to_string()), AisCode::Number),
        ),
        Value::String(_) => as_text(value).map(AisCode::Text),
        _ => None,
    }
}
