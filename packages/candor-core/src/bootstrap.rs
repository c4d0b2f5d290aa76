//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together. This pattern provides:
//!
//! - **Clarity**: All dependency relationships are visible in one place
//! - **Testability**: Easy to swap implementations (store, detectors)
//! - **Maintainability**: Service creation logic is isolated from usage

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::api::WsConnectionManager;
use crate::detect::DetectorSet;
use crate::error::CandorResult;
use crate::events::{BroadcastEvent, BroadcastEventBridge, EventEmitter};
use crate::runtime::TokioSpawner;
use crate::session::SessionManager;
use crate::state::Config;
use crate::store::{MemoryStore, Store};

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// The four shared detector instances.
    pub detectors: DetectorSet,
    /// Persistence backend.
    pub store: Arc<dyn Store>,
    /// Broadcast channel sender for real-time events.
    pub broadcast_tx: broadcast::Sender<BroadcastEvent>,
    /// Event bridge for emitting events to WebSocket and optional external consumers.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Session lifecycle registry.
    pub session_manager: Arc<SessionManager>,
    /// Manages WebSocket connections.
    pub ws_manager: Arc<WsConnectionManager>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Signal cancellation to background tasks
        self.cancel_token.cancel();

        // Close observer connections first so clients see the socket drop
        // before their sessions vanish.
        let connections_closed = self.ws_manager.close_all();
        if connections_closed > 0 {
            log::info!(
                "[Bootstrap] Closed {} WebSocket connection(s)",
                connections_closed
            );
        }

        // Stop every live session (each performs its final flush).
        let sessions_stopped = self.session_manager.stop_all().await;
        log::info!("[Bootstrap] Stopped {} session(s)", sessions_stopped);

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps all application services with their dependencies.
///
/// This is the composition root; services are created in dependency order:
///
/// 1. Shared infrastructure (broadcast channel, cancellation token, spawner)
/// 2. Event bridge mapping domain events to broadcast transport
/// 3. Detectors (shared, re-entrant) and the store
/// 4. Session manager (depends on detectors, store, bridge, spawner)
///
/// Uses the in-memory store; embedders with a durable backend use
/// [`bootstrap_services_with_store`].
pub fn bootstrap_services(config: &Config) -> CandorResult<BootstrappedServices> {
    bootstrap_services_with_store(config, Arc::new(MemoryStore::new()))
}

/// Bootstraps services against a caller-provided persistence backend.
pub fn bootstrap_services_with_store(
    config: &Config,
    store: Arc<dyn Store>,
) -> CandorResult<BootstrappedServices> {
    // Create task spawner from current runtime
    let spawner = TokioSpawner::current();

    // Create broadcast channel for real-time events to WebSocket clients
    let (broadcast_tx, _) = broadcast::channel::<BroadcastEvent>(config.event_channel_capacity);

    // Create the event bridge that maps domain events to broadcast transport
    let event_bridge = Arc::new(BroadcastEventBridge::with_sender(broadcast_tx.clone()));

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Validate engine config (fail fast before any session can start)
    config
        .engine
        .validate()
        .map_err(crate::error::CandorError::Configuration)?;

    // Shared state
    let ws_manager = Arc::new(WsConnectionManager::new());
    let detectors = DetectorSet::heuristic();

    // Wire up the session manager with its dependencies
    let session_manager = Arc::new(SessionManager::new(
        detectors.clone(),
        Arc::clone(&store),
        Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
        spawner.clone(),
        config.engine.clone(),
    ));

    Ok(BootstrappedServices {
        detectors,
        store,
        broadcast_tx,
        event_bridge,
        session_manager,
        ws_manager,
        spawner,
        cancel_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_wires_services() {
        let services = bootstrap_services(&Config::default()).unwrap();
        assert_eq!(services.session_manager.session_count(), 0);
        assert_eq!(services.ws_manager.connection_count(), 0);
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_engine_config() {
        let mut config = Config::default();
        config.engine.poll_step_ms = 0;
        assert!(bootstrap_services(&config).is_err());
    }

    #[tokio::test]
    async fn shutdown_stops_sessions() {
        let services = bootstrap_services(&Config::default()).unwrap();
        services
            .session_manager
            .start("s1", "u1", None)
            .unwrap();
        assert_eq!(services.session_manager.session_count(), 1);

        services.shutdown().await;
        assert_eq!(services.session_manager.session_count(), 0);
    }
}
