//! Shared type definitions for the AIS relay.
//!
//! This crate is the single source of truth for the vessel record and the
//! JSON wire protocol spoken between the relay and its clients. Wire-visible
//! types flow downstream to `TypeScript` via `ts-rs` for viewer frontends.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifiers (connection sessions)
//! - [`enums`] -- Client roles and removal reasons
//! - [`ship`] -- Canonical [`ShipRecord`], partial [`ShipUpdate`], dimensions
//! - [`protocol`] -- Inbound [`ClientMessage`] and outbound [`ServerEvent`]

pub mod enums;
pub mod ids;
pub mod protocol;
pub mod ship;

// Re-export all public types at crate root for convenience.
pub use enums::{ClientRole, RemovalReason};
pub use ids::ConnectionId;
pub use protocol::{ClientMessage, ServerEvent};
pub use ship::{AisCode, Dimensions, EvictedShip, PositionReport, ShipRecord, ShipUpdate};
