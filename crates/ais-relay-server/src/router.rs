//! Axum router construction for the relay.
//!
//! Assembles the `WebSocket` endpoint and the status routes into a single
//! [`Router`] with CORS enabled so browser viewers on other origins can
//! connect.

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete relay router.
///
/// - `GET /` -- `WebSocket` upgrade
/// - `GET /ws` -- `WebSocket` upgrade (alias)
/// - `GET /health` -- liveness probe
/// - `GET /api/stats` -- ship and connection counts
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws::ws_upgrade))
        .route("/ws", get(ws::ws_upgrade))
        .route("/health", get(handlers::health))
        .route("/api/stats", get(handlers::stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
