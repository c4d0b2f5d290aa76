//! Event system for real-time client communication.
//!
//! This module provides:
//! - [`EventEmitter`] trait for domain services to emit events
//! - Event types for session lifecycle and analysis updates
//!
//! The actual transport implementation (WebSocket) is handled separately in
//! the `api` module using [`BroadcastEventBridge`].

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::analysis::Sample;

/// Events broadcast to clients.
///
/// This enum categorizes all real-time events that can be sent to connected
/// clients. Each category has its own inner event type with specific variants.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum BroadcastEvent {
    /// Session lifecycle events.
    Session(SessionEvent),

    /// Analysis emission events.
    Analysis(AnalysisEvent),
}

/// Session lifecycle events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A session scheduler was started.
    Started {
        /// The interview session id.
        session_id: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A session scheduler stopped (graceful stop or fatal error).
    Stopped {
        /// The interview session id.
        session_id: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Analysis emission events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    /// A composite sample was produced for a session.
    Update {
        /// The interview session id.
        session_id: String,
        /// Unix timestamp of the emission in milliseconds.
        timestamp: u64,
        /// The full canonical sample.
        analysis: Sample,
    },
}

impl AnalysisEvent {
    /// The session this event belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            Self::Update { session_id, .. } => session_id,
        }
    }
}

// From implementations for converting inner events to BroadcastEvent
impl From<SessionEvent> for BroadcastEvent {
    fn from(event: SessionEvent) -> Self {
        BroadcastEvent::Session(event)
    }
}

impl From<AnalysisEvent> for BroadcastEvent {
    fn from(event: AnalysisEvent) -> Self {
        BroadcastEvent::Analysis(event)
    }
}
