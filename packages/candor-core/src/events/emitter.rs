//! Event emitter abstraction for decoupling services from transport.
//!
//! Services depend on the [`EventEmitter`] trait rather than concrete
//! broadcast channels, enabling testing and alternative transport
//! implementations.

use super::{AnalysisEvent, SessionEvent};

/// Trait for emitting domain events without knowledge of transport.
///
/// The sample publisher and session manager use this trait to emit events,
/// decoupling them from how events are delivered to observers (WebSocket,
/// embedder frontend, test harness).
pub trait EventEmitter: Send + Sync {
    /// Emits a session lifecycle event.
    fn emit_session(&self, event: SessionEvent);

    /// Emits an analysis update event.
    fn emit_analysis(&self, event: AnalysisEvent);
}

/// No-op emitter for headless embedding or testing.
///
/// Events are silently discarded.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_session(&self, _event: SessionEvent) {
        // No-op
    }

    fn emit_analysis(&self, _event: AnalysisEvent) {
        // No-op
    }
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level. Useful for debugging event flow
/// or in development environments.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_session(&self, event: SessionEvent) {
        tracing::debug!(?event, "session_event");
    }

    fn emit_analysis(&self, event: AnalysisEvent) {
        tracing::debug!(?event, "analysis_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::analysis::Sample;

    /// Test emitter that counts events.
    struct CountingEventEmitter {
        session_count: AtomicUsize,
        analysis_count: AtomicUsize,
    }

    impl CountingEventEmitter {
        fn new() -> Self {
            Self {
                session_count: AtomicUsize::new(0),
                analysis_count: AtomicUsize::new(0),
            }
        }
    }

    impl EventEmitter for CountingEventEmitter {
        fn emit_session(&self, _event: SessionEvent) {
            self.session_count.fetch_add(1, Ordering::SeqCst);
        }

        fn emit_analysis(&self, _event: AnalysisEvent) {
            self.analysis_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn counting_emitter_tracks_events() {
        let emitter = Arc::new(CountingEventEmitter::new());

        emitter.emit_session(SessionEvent::Started {
            session_id: "test".to_string(),
            timestamp: 0,
        });
        emitter.emit_session(SessionEvent::Stopped {
            session_id: "test".to_string(),
            timestamp: 0,
        });
        emitter.emit_analysis(AnalysisEvent::Update {
            session_id: "test".to_string(),
            timestamp: 0,
            analysis: Sample::default(),
        });

        assert_eq!(emitter.session_count.load(Ordering::SeqCst), 2);
        assert_eq!(emitter.analysis_count.load(Ordering::SeqCst), 1);
    }
}
