//! Durable ship store for the AIS relay (`PostgreSQL`).
//!
//! The relay's in-memory registry is the source of truth for live vessel
//! state. This crate keeps a downstream replica: one row per MMSI, upserted
//! after every accepted message. Nothing here is ever read back into the
//! live registry.
//!
//! # Architecture
//!
//! ```text
//! Registry.upsert
//!     |
//!     +-- persist queue --> ShipStore::upsert_ship --> PostgreSQL ships table
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`ship_store`] -- Ship table schema, upsert, and lookups
//! - [`error`] -- Shared error types

pub mod error;
pub mod postgres;
pub mod ship_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use ship_store::{ShipRow, ShipStore, is_valid_identifier};
