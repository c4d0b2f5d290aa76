//! Process-wide session registry and lifecycle driver.

use std::sync::Arc;

use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::analysis::{
    canonicalize, ModalityStates, Sample, SamplePublisher, SessionScheduler, Stamped,
};
use crate::detect::{
    DetectorSet, EyeObservation, FaceObservation, HandObservation, VoiceObservation,
};
use crate::error::{CandorError, CandorResult};
use crate::events::{AnalysisEvent, EventEmitter, SessionEvent};
use crate::media::{AudioChunk, MediaIntake, VideoFrame};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::scoring::Aggregator;
use crate::state::EngineConfig;
use crate::store::Store;
use crate::utils::now_millis;

use super::{SessionContext, SessionState, SessionView};

struct SessionEntry {
    context: SessionContext,
    state: RwLock<SessionState>,
    started_at: u64,
    intake: Arc<MediaIntake>,
    cancel: CancellationToken,
    done: watch::Receiver<bool>,
    last_sample: Arc<RwLock<Option<Sample>>>,
}

/// Registry of live sessions, keyed by session id.
///
/// Owns exactly one scheduler per active session: `start` on a running id is
/// a no-op error and never creates a second scheduler. The offer fan-in path
/// reads through the registry without holding locks across awaits.
pub struct SessionManager {
    sessions: Arc<DashMap<String, SessionEntry>>,
    detectors: DetectorSet,
    publisher: Arc<SamplePublisher>,
    emitter: Arc<dyn EventEmitter>,
    aggregator: Arc<Aggregator>,
    spawner: TokioSpawner,
    config: EngineConfig,
}

impl SessionManager {
    pub fn new(
        detectors: DetectorSet,
        store: Arc<dyn Store>,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
        config: EngineConfig,
    ) -> Self {
        let publisher = Arc::new(SamplePublisher::new(
            Arc::clone(&store),
            Arc::clone(&emitter),
        ));
        let aggregator = Arc::new(Aggregator::new(store));
        Self {
            sessions: Arc::new(DashMap::new()),
            detectors,
            publisher,
            emitter,
            aggregator,
            spawner,
            config,
        }
    }

    /// The post-session aggregator (also used by the direct REST path).
    pub fn aggregator(&self) -> Arc<Aggregator> {
        Arc::clone(&self.aggregator)
    }

    /// Starts analysis for a session.
    ///
    /// # Errors
    ///
    /// Returns [`CandorError::SessionAlreadyRunning`] when the id already
    /// has an active scheduler.
    pub fn start(
        &self,
        session_id: &str,
        user_id: &str,
        job_role_id: Option<&str>,
    ) -> CandorResult<()> {
        use dashmap::mapref::entry::Entry;

        let entry = match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(_) => {
                return Err(CandorError::SessionAlreadyRunning(session_id.to_string()))
            }
            Entry::Vacant(vacant) => vacant,
        };

        let context = SessionContext {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            job_role_id: job_role_id.map(str::to_string),
        };
        let intake = Arc::new(MediaIntake::new(
            self.config.video_queue_capacity,
            self.config.audio_queue_capacity,
        ));
        let cancel = CancellationToken::new();
        let last_sample = Arc::new(RwLock::new(None));
        let (done_tx, done_rx) = watch::channel(false);

        let scheduler = SessionScheduler::new(
            context.clone(),
            self.config.clone(),
            self.detectors.clone(),
            Arc::clone(&self.publisher),
            Arc::clone(&intake),
            cancel.clone(),
            Arc::clone(&last_sample),
        );

        entry.insert(SessionEntry {
            context: context.clone(),
            state: RwLock::new(SessionState::Starting),
            started_at: now_millis(),
            intake,
            cancel,
            done: done_rx,
            last_sample,
        });

        let sessions = Arc::clone(&self.sessions);
        let emitter = Arc::clone(&self.emitter);
        let fatal_context = context.clone();
        self.spawner.spawn(async move {
            // A bug inside the loop must not leave a zombie registry entry:
            // catch the panic, drop the session, broadcast a terminal update.
            let result = std::panic::AssertUnwindSafe(scheduler.run())
                .catch_unwind()
                .await;
            if let Err(panic) = result {
                let message = panic_message(panic.as_ref());
                log::error!(
                    "[Session] Scheduler for {} died: {}",
                    fatal_context.session_id,
                    message
                );
                if let Some((_, entry)) = sessions.remove(&fatal_context.session_id) {
                    *entry.state.write() = SessionState::Stopped;
                    entry.intake.close();
                }
                let sample = error_sample(&fatal_context);
                emitter.emit_analysis(AnalysisEvent::Update {
                    session_id: fatal_context.session_id.clone(),
                    timestamp: sample.timestamp,
                    analysis: sample,
                });
                emitter.emit_session(SessionEvent::Stopped {
                    session_id: fatal_context.session_id.clone(),
                    timestamp: now_millis(),
                });
            }
            let _ = done_tx.send(true);
        });

        if let Some(entry) = self.sessions.get(session_id) {
            *entry.state.write() = SessionState::Running;
        }
        self.emitter.emit_session(SessionEvent::Started {
            session_id: session_id.to_string(),
            timestamp: now_millis(),
        });
        log::info!("[Session] Started {} for user {}", session_id, user_id);
        Ok(())
    }

    /// Stops a session: cancels its scheduler, waits up to the stop deadline
    /// for the final flush, removes it from the registry, and schedules
    /// aggregation as a detached task.
    ///
    /// # Errors
    ///
    /// Returns [`CandorError::SessionNotFound`] for an unknown id.
    pub async fn stop(&self, session_id: &str) -> CandorResult<()> {
        let (context, cancel, mut done) = {
            let entry = self
                .sessions
                .get(session_id)
                .ok_or_else(|| CandorError::SessionNotFound(session_id.to_string()))?;
            *entry.state.write() = SessionState::Stopping;
            (entry.context.clone(), entry.cancel.clone(), entry.done.clone())
        };

        cancel.cancel();

        let graceful = tokio::time::timeout(self.config.stop_deadline(), async {
            while !*done.borrow_and_update() {
                if done.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .is_ok();

        if !graceful {
            log::warn!(
                "[Session] {} did not stop within {}ms; abandoning scheduler task",
                session_id,
                self.config.stop_deadline_ms
            );
        }

        if let Some((_, entry)) = self.sessions.remove(session_id) {
            *entry.state.write() = SessionState::Stopped;
            entry.intake.close();
        }
        self.emitter.emit_session(SessionEvent::Stopped {
            session_id: session_id.to_string(),
            timestamp: now_millis(),
        });

        let aggregator = Arc::clone(&self.aggregator);
        self.spawner.spawn(async move {
            if let Err(e) = aggregator
                .finalize(
                    &context.session_id,
                    &context.user_id,
                    context.job_role_id.as_deref(),
                )
                .await
            {
                log::error!(
                    "[Session] Finalize failed for {}: {}",
                    context.session_id,
                    e
                );
            }
        });

        log::info!(
            "[Session] Stopped {} ({})",
            session_id,
            if graceful { "graceful" } else { "deadline" }
        );
        Ok(())
    }

    /// Stops every live session; used on shutdown.
    pub async fn stop_all(&self) -> usize {
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        let count = ids.len();
        for id in ids {
            if let Err(e) = self.stop(&id).await {
                log::warn!("[Session] stop_all: {}: {}", id, e);
            }
        }
        count
    }

    /// Fan-in from socket handlers: hands a frame to the session's intake.
    pub fn offer_video(&self, session_id: &str, frame: VideoFrame) -> CandorResult<()> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| CandorError::SessionNotFound(session_id.to_string()))?;
        entry.intake.offer_video(frame);
        Ok(())
    }

    /// Fan-in from socket handlers: hands an audio chunk to the session's
    /// intake.
    pub fn offer_audio(&self, session_id: &str, chunk: AudioChunk) -> CandorResult<()> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| CandorError::SessionNotFound(session_id.to_string()))?;
        entry.intake.offer_audio(chunk);
        Ok(())
    }

    /// Read-only view of a live session, with its last emitted sample.
    pub fn lookup(&self, session_id: &str) -> Option<SessionView> {
        self.sessions.get(session_id).map(|entry| SessionView {
            session_id: entry.context.session_id.clone(),
            user_id: entry.context.user_id.clone(),
            job_role_id: entry.context.job_role_id.clone(),
            state: *entry.state.read(),
            started_at: entry.started_at,
            last_sample: entry.last_sample.read().clone(),
        })
    }

    /// Whether a session currently has an active scheduler.
    pub fn is_active(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Terminal sample broadcast when a scheduler dies on an internal bug:
/// every component carries `method: "error"`.
fn error_sample(context: &SessionContext) -> Sample {
    let ts = now_millis();
    let states = ModalityStates {
        face: Some(Stamped::new(FaceObservation::fault(), ts)),
        eye: Some(Stamped::new(EyeObservation::fault(), ts)),
        hand: Some(Stamped::new(HandObservation::fault(), ts)),
        voice: Some(Stamped::new(VoiceObservation::fault(), ts)),
    };
    canonicalize(context, &states, ts)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEventEmitter;
    use crate::store::MemoryStore;

    fn manager() -> (SessionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(
            DetectorSet::heuristic(),
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::new(NoopEventEmitter),
            TokioSpawner::current(),
            EngineConfig::default(),
        );
        (manager, store)
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_already_running() {
        let (manager, _) = manager();
        manager.start("s1", "u1", None).unwrap();
        let err = manager.start("s1", "u1", None).unwrap_err();
        assert!(matches!(err, CandorError::SessionAlreadyRunning(_)));
        assert_eq!(manager.session_count(), 1);
        manager.stop("s1").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_unknown_is_not_found() {
        let (manager, _) = manager();
        let err = manager.stop("nope").await.unwrap_err();
        assert!(matches!(err, CandorError::SessionNotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_removes_session_and_emits_final_flush() {
        let (manager, store) = manager();
        manager.start("s1", "u1", None).unwrap();
        assert!(manager.is_active("s1"));

        manager.stop("s1").await.unwrap();

        assert!(!manager.is_active("s1"));
        assert!(manager.lookup("s1").is_none());

        // The final flush persisted exactly one (terminal) sample.
        let samples = store.list_samples("s1").await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(
            samples[0].voice_confidence.confidence_level,
            crate::detect::ConfidenceLevel::SessionStopped
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_schedules_finalization() {
        let (manager, store) = manager();
        manager.start("s1", "u1", None).unwrap();
        manager.stop("s1").await.unwrap();

        // Let the detached finalize task run.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let score = store.get_final_score("s1").await.unwrap();
        assert!(score.is_some());
        assert_eq!(score.unwrap().samples_analyzed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn offers_to_unknown_session_are_not_found() {
        let (manager, _) = manager();
        let frame = VideoFrame::from_rgb8(1, 1, vec![0, 0, 0]);
        assert!(manager.offer_video("ghost", frame).is_err());
        let chunk = AudioChunk::new(vec![0.5; 8], 22_050).unwrap();
        assert!(manager.offer_audio("ghost", chunk).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_reports_running_state() {
        let (manager, _) = manager();
        manager.start("s1", "u1", Some("r1")).unwrap();

        let view = manager.lookup("s1").unwrap();
        assert_eq!(view.state, SessionState::Running);
        assert_eq!(view.job_role_id.as_deref(), Some("r1"));
        assert!(view.last_sample.is_none());

        manager.stop("s1").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn same_id_can_restart_after_stop() {
        let (manager, _) = manager();
        manager.start("s1", "u1", None).unwrap();
        manager.stop("s1").await.unwrap();
        assert!(manager.start("s1", "u1", None).is_ok());
        manager.stop("s1").await.unwrap();
    }
}
