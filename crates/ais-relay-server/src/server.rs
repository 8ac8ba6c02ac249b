//! Relay HTTP server lifecycle management.
//!
//! [`start_server`] binds the configured address and serves until the
//! supplied shutdown future resolves; [`shutdown_signal`] is the usual
//! choice for that future.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::router::build_router;
use crate::state::AppState;

/// Listen address for the relay.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host name or address to bind to (e.g. `0.0.0.0` or `localhost`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

/// Bind the configured address and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the host does not resolve, the TCP listener cannot
/// bind, or the server encounters a fatal I/O error.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| {
            ServerError::Bind(format!(
                "bind failed on {}:{}: {e}",
                config.host, config.port
            ))
        })?;

    match listener.local_addr() {
        Ok(addr) => info!(%addr, "AIS relay listening"),
        Err(_) => info!(host = config.host.as_str(), port = config.port, "AIS relay listening"),
    }

    serve(listener, state, shutdown).await
}

/// Serve the relay on an already-bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server encounters a fatal I/O error.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let router = build_router(state);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| ServerError::Serve(format!("serve error: {e}")))
}

/// Resolve on `Ctrl-C`, or on `SIGTERM` where supported.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Errors that can occur when starting or running the relay server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::hub::BroadcastHub;
    use crate::registry::ShipRegistry;

    fn state() -> AppState {
        AppState::new(Arc::new(BroadcastHub::new(Arc::new(ShipRegistry::new()))))
    }

    #[test]
    fn default_listen_address() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
    }

    #[tokio::test]
    async fn port_in_use_is_a_bind_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: taken.local_addr().unwrap().port(),
        };
        let result = start_server(&config, state(), async {}).await;
        assert!(matches!(result, Err(ServerError::Bind(_))));
    }

    #[tokio::test]
    async fn hostname_is_resolved_before_bind() {
        let config = ServerConfig {
            host: "localhost".to_owned(),
            port: 0,
        };
        let result = start_server(&config, state(), async {}).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn serve_returns_after_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let result = serve(listener, state(), async {}).await;
        assert!(result.is_ok());
    }
}
