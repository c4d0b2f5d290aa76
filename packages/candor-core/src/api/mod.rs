//! HTTP/WebSocket API layer.
//!
//! This module contains thin handlers that delegate to the session manager
//! and store. It provides the router construction and server startup
//! functionality.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::events::BroadcastEventBridge;
use crate::session::SessionManager;
use crate::state::Config;
use crate::store::Store;

pub mod http;
pub mod response;
pub mod ws;
pub mod ws_connection;

pub use ws_connection::WsConnectionManager;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Shared application state for the API layer.
///
/// A thin wrapper holding references to services; all business logic lives
/// in the services themselves.
#[derive(Clone)]
pub struct AppState {
    /// Session lifecycle and fan-in.
    pub session_manager: Arc<SessionManager>,
    /// Persistence backend (job roles, samples, final scores).
    pub store: Arc<dyn Store>,
    /// Event bridge WebSocket handlers subscribe to.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Manages WebSocket connections.
    pub ws_manager: Arc<WsConnectionManager>,
    /// Application configuration.
    pub config: Arc<RwLock<Config>>,
}

impl AppState {
    /// Builds the API state from bootstrapped services.
    pub fn new(services: &crate::BootstrappedServices, config: Arc<RwLock<Config>>) -> Self {
        Self {
            session_manager: Arc::clone(&services.session_manager),
            store: Arc::clone(&services.store),
            event_bridge: Arc::clone(&services.event_bridge),
            ws_manager: Arc::clone(&services.ws_manager),
            config,
        }
    }
}

async fn find_available_port(
    start: u16,
    end: u16,
) -> Result<(u16, tokio::net::TcpListener), ServerError> {
    for port in start..=end {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

/// Starts the HTTP server on the configured or auto-discovered port.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let preferred_port = state.config.read().preferred_port;
    let (port, listener) = if preferred_port > 0 {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], preferred_port));
        (preferred_port, tokio::net::TcpListener::bind(&addr).await?)
    } else {
        find_available_port(7900, 7910).await?
    };

    log::info!("Server listening on http://0.0.0.0:{}", port);
    let app = http::create_router(state);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
