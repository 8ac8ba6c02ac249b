//! Real-time AIS vessel relay.
//!
//! Senders push decoded AIS messages over a `WebSocket`; the relay normalizes
//! them, merges them into one canonical record per vessel, and fans every
//! change out to connected viewers. Idle vessels are evicted on a timer and
//! every merged record can be mirrored to `PostgreSQL`.
//!
//! # Architecture
//!
//! ```text
//! sender --ais_data--> Normalizer --> ShipRegistry --> BroadcastHub --> viewers
//!                                          |                 \
//!                                   eviction sweep    PersistQueue --> ShipSink
//! ```
//!
//! - [`normalizer`] -- alias resolution from raw decoder output to [`ShipUpdate`]
//! - [`registry`] -- the live MMSI-keyed map with field-wise merge and eviction
//! - [`hub`] -- connection roles, inbound routing, and fan-out
//! - [`eviction`] -- the periodic stale sweep
//! - [`sink`] -- best-effort durable persistence
//! - [`ws`], [`router`], [`server`] -- the Axum transport
//!
//! [`ShipUpdate`]: ais_relay_types::ShipUpdate

pub mod config;
pub mod error;
pub mod eviction;
pub mod handlers;
pub mod hub;
pub mod normalizer;
pub mod registry;
pub mod router;
pub mod server;
pub mod sink;
pub mod startup;
pub mod state;
pub mod stats;
pub mod ws;

// Re-export primary types for convenience.
pub use config::RelayConfig;
pub use hub::BroadcastHub;
pub use registry::ShipRegistry;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, serve, shutdown_signal, start_server};
pub use sink::{PersistQueue, PgShipSink, ShipSink, SinkError};
pub use state::AppState;
pub use stats::RelayStats;
