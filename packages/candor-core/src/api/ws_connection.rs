//! WebSocket connection tracking and management.
//!
//! Observer connections (interviewer dashboards, producer clients) register
//! here so shutdown can force-close them:
//!
//! - `WsConnectionManager`: tracks all active WebSocket connections
//! - `ConnectionGuard`: RAII guard for automatic cleanup on disconnect

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::utils::now_millis;

/// Internal per-connection state.
struct ConnectionState {
    /// Unix timestamp (ms) when the connection registered.
    #[allow(dead_code)]
    connected_at: u64,
}

/// Manages all active WebSocket connections.
///
/// Thread-safe and designed for concurrent access from multiple WebSocket
/// handlers. Uses hierarchical cancellation tokens for efficient force-close
/// of all connections.
pub struct WsConnectionManager {
    /// Active connections: connection_id -> ConnectionState
    connections: DashMap<String, ConnectionState>,
    /// Counter for generating unique connection IDs.
    next_id: AtomicU64,
    /// Global cancellation token - when cancelled, all connections close.
    /// Wrapped in RwLock so it can be replaced after close_all().
    global_cancel: RwLock<CancellationToken>,
}

impl WsConnectionManager {
    /// Creates a new connection manager.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            global_cancel: RwLock::new(CancellationToken::new()),
        }
    }

    /// Registers a new connection and returns a guard for RAII cleanup.
    pub fn register(self: &Arc<Self>) -> ConnectionGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let conn_id = format!("ws-{}", id);
        let cancel_token = self.global_cancel.read().child_token();

        self.connections.insert(
            conn_id.clone(),
            ConnectionState {
                connected_at: now_millis(),
            },
        );
        log::info!(
            "[WS] Connection registered: {} (total: {})",
            conn_id,
            self.connections.len()
        );

        ConnectionGuard {
            id: conn_id,
            manager: Arc::clone(self),
            cancel_token,
        }
    }

    /// Unregisters a connection by ID.
    fn unregister(&self, id: &str) {
        if self.connections.remove(id).is_some() {
            log::info!(
                "[WS] Connection unregistered: {} (remaining: {})",
                id,
                self.connections.len()
            );
        }
    }

    /// Returns the number of active connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Force-closes all connections.
    ///
    /// Cancels the global token, signaling all connection handlers to
    /// terminate; a fresh token is installed so new connections can still be
    /// accepted. Returns the number of connections signaled.
    pub fn close_all(&self) -> usize {
        let count = self.connections.len();
        if count > 0 {
            log::info!("[WS] Force-closing {} connection(s)", count);
            let mut guard = self.global_cancel.write();
            guard.cancel();
            *guard = CancellationToken::new();
        }
        count
    }
}

impl Default for WsConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard that unregisters a connection when dropped.
///
/// Ensures connections are always cleaned up, even if the handler panics or
/// exits early.
pub struct ConnectionGuard {
    id: String,
    manager: Arc<WsConnectionManager>,
    /// Token for this specific connection - cancelled on force-close.
    cancel_token: CancellationToken,
}

impl ConnectionGuard {
    /// Returns the connection ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the cancellation token for this connection.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.manager.unregister(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_drop_tracks_count() {
        let manager = Arc::new(WsConnectionManager::new());
        assert_eq!(manager.connection_count(), 0);

        let guard = manager.register();
        assert_eq!(manager.connection_count(), 1);
        assert!(guard.id().starts_with("ws-"));

        drop(guard);
        assert_eq!(manager.connection_count(), 0);
    }

    #[test]
    fn close_all_cancels_registered_connections() {
        let manager = Arc::new(WsConnectionManager::new());
        let guard = manager.register();
        assert!(!guard.cancel_token().is_cancelled());

        let closed = manager.close_all();
        assert_eq!(closed, 1);
        assert!(guard.cancel_token().is_cancelled());

        // New connections get a fresh token.
        let fresh = manager.register();
        assert!(!fresh.cancel_token().is_cancelled());
    }

    #[test]
    fn close_all_with_no_connections_is_zero() {
        let manager = Arc::new(WsConnectionManager::new());
        assert_eq!(manager.close_all(), 0);
    }
}
