//! Persistence and broadcast of emitted samples.

use std::sync::Arc;

use crate::events::{AnalysisEvent, EventEmitter};
use crate::store::Store;

use super::Sample;

/// Publishes each composite sample: persist first, broadcast second.
///
/// Liveness beats per-sample durability: a store failure loses that sample
/// but never blocks the next tick, and broadcast failures are best-effort.
/// Safe to call concurrently from different session tasks.
pub struct SamplePublisher {
    store: Arc<dyn Store>,
    emitter: Arc<dyn EventEmitter>,
}

impl SamplePublisher {
    pub fn new(store: Arc<dyn Store>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self { store, emitter }
    }

    /// Persists and broadcasts one sample.
    pub async fn publish(&self, sample: Sample) {
        if let Err(e) = self.store.persist_sample(&sample).await {
            log::error!(
                "[Publisher] Failed to persist sample for session {}: {}",
                sample.session_id,
                e
            );
        }

        self.emitter.emit_analysis(AnalysisEvent::Update {
            session_id: sample.session_id.clone(),
            timestamp: sample.timestamp,
            analysis: sample,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::events::{BroadcastEventBridge, SessionEvent};
    use crate::store::{MemoryStore, StoreError, StoreResult};

    struct FailingStore {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Store for FailingStore {
        async fn persist_sample(&self, _sample: &Sample) -> StoreResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Backend("disk gone".into()))
        }

        async fn list_samples(&self, _session_id: &str) -> StoreResult<Vec<Sample>> {
            Ok(vec![])
        }

        async fn persist_final_score(
            &self,
            _session_id: &str,
            _score: &crate::scoring::FinalScore,
        ) -> StoreResult<()> {
            Ok(())
        }

        async fn get_final_score(
            &self,
            _session_id: &str,
        ) -> StoreResult<Option<crate::scoring::FinalScore>> {
            Ok(None)
        }

        async fn get_job_role(
            &self,
            _job_role_id: &str,
        ) -> StoreResult<Option<crate::scoring::JobRole>> {
            Ok(None)
        }

        async fn create_job_role(&self, _role: &crate::scoring::JobRole) -> StoreResult<()> {
            Ok(())
        }
    }

    fn sample(session: &str, ts: u64) -> Sample {
        Sample {
            session_id: session.to_string(),
            timestamp: ts,
            ..Sample::default()
        }
    }

    #[tokio::test]
    async fn publish_persists_and_broadcasts() {
        let store = Arc::new(MemoryStore::new());
        let bridge = Arc::new(BroadcastEventBridge::new(8));
        let mut rx = bridge.subscribe();
        let publisher = SamplePublisher::new(
            Arc::clone(&store) as Arc<dyn Store>,
            bridge as Arc<dyn EventEmitter>,
        );

        publisher.publish(sample("s1", 42)).await;

        assert_eq!(store.sample_count("s1"), 1);
        let event = rx.try_recv().expect("broadcast expected");
        match event {
            crate::events::BroadcastEvent::Analysis(AnalysisEvent::Update {
                session_id,
                timestamp,
                ..
            }) => {
                assert_eq!(session_id, "s1");
                assert_eq!(timestamp, 42);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn store_failure_still_broadcasts() {
        let store = Arc::new(FailingStore {
            attempts: AtomicUsize::new(0),
        });
        let bridge = Arc::new(BroadcastEventBridge::new(8));
        let mut rx = bridge.subscribe();
        let publisher = SamplePublisher::new(
            Arc::clone(&store) as Arc<dyn Store>,
            bridge as Arc<dyn EventEmitter>,
        );

        publisher.publish(sample("s1", 1)).await;

        assert_eq!(store.attempts.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_ok(), "broadcast must survive store failure");
    }

    #[tokio::test]
    async fn publisher_ignores_session_events() {
        // Compile-time shape check: the publisher only emits analysis events.
        let bridge = Arc::new(BroadcastEventBridge::new(8));
        bridge.emit_session(SessionEvent::Started {
            session_id: "s1".to_string(),
            timestamp: 0,
        });
    }
}
