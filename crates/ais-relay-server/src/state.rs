//! Shared application state for the relay's HTTP and `WebSocket` handlers.

use std::sync::Arc;

use crate::hub::BroadcastHub;

/// State handed to every Axum handler.
///
/// Cloning is cheap: it only bumps the reference count on the hub.
#[derive(Clone)]
pub struct AppState {
    hub: Arc<BroadcastHub>,
}

impl AppState {
    /// Wrap an existing hub.
    pub const fn new(hub: Arc<BroadcastHub>) -> Self {
        Self { hub }
    }

    /// The connection hub.
    pub const fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }
}
