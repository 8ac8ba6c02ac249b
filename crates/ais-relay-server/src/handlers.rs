//! Read-only HTTP endpoints.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/stats` | Current [`RelayStats`] |

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;
use crate::stats::RelayStats;

/// Liveness probe.
///
/// # Route
///
/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Current ship and connection counts.
///
/// # Route
///
/// `GET /api/stats`
pub async fn stats(State(state): State<AppState>) -> Json<RelayStats> {
    Json(state.hub().stats().await)
}
