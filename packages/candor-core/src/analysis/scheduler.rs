//! The per-session cadence loop.
//!
//! One scheduler task owns one session's media intake, audio buffer, and
//! modality state. It wakes on a short poll step and decides whether a
//! composite tick, an audio-inactivity flush, or cancellation is due. Ticks
//! run strictly sequentially on the loop task, so there is never more than
//! one in-flight detector run per modality per session; a tick that overruns
//! simply delays the next wake instead of queueing late ticks.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::detect::{
    ConfidenceLevel, DetectorSet, EyeObservation, FaceObservation, HandObservation,
    VoiceObservation,
};
use crate::media::{AudioBuffer, MediaIntake, VideoFrame};
use crate::protocol_constants::{AUDIO_MIN_RMS, DETECTOR_SOFT_DEADLINE_MS};
use crate::session::SessionContext;
use crate::state::EngineConfig;
use crate::utils::{now_millis, rms};

use super::{canonicalize, ModalityStates, Sample, SamplePublisher, Stamped};

/// Which visual detector a composite tick dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VisualSlot {
    Face,
    Hand,
    Eye,
}

/// Round-robin selection of the visual modality for a given cycle count.
///
/// Only one visual model runs per composite tick to bound CPU; the other two
/// modalities retain their previous observation.
pub(crate) fn rotation_slot(cycle_counter: u64) -> VisualSlot {
    match cycle_counter % 3 {
        0 => VisualSlot::Face,
        1 => VisualSlot::Hand,
        _ => VisualSlot::Eye,
    }
}

/// The per-session analysis loop.
///
/// Created and spawned by the session manager; exits on cancellation after a
/// final flush, or when its task is aborted past the stop deadline.
pub struct SessionScheduler {
    context: SessionContext,
    config: EngineConfig,
    detectors: DetectorSet,
    publisher: Arc<SamplePublisher>,
    intake: Arc<MediaIntake>,
    cancel: CancellationToken,
    /// Shared with the session registry for live queries.
    last_sample: Arc<RwLock<Option<Sample>>>,

    audio: AudioBuffer,
    states: ModalityStates,
    cycle_counter: u64,
    /// Completed voice cadence intervals, counted against the cadence anchor.
    voice_analyses_done: u64,
    /// Total voice analysis runs, including flush-path runs.
    voice_runs: u64,
    session_started: Instant,
    last_composite: Instant,
    /// Last emitted sample timestamp; emissions are strictly increasing.
    last_emit_ts: u64,
}

impl SessionScheduler {
    pub fn new(
        context: SessionContext,
        config: EngineConfig,
        detectors: DetectorSet,
        publisher: Arc<SamplePublisher>,
        intake: Arc<MediaIntake>,
        cancel: CancellationToken,
        last_sample: Arc<RwLock<Option<Sample>>>,
    ) -> Self {
        let now = Instant::now();
        let audio = AudioBuffer::new(Duration::from_millis(config.audio_window_ms));
        Self {
            context,
            config,
            detectors,
            publisher,
            intake,
            cancel,
            last_sample,
            audio,
            states: ModalityStates::default(),
            cycle_counter: 0,
            voice_analyses_done: 0,
            voice_runs: 0,
            session_started: now,
            last_composite: now,
            last_emit_ts: 0,
        }
    }

    /// Runs the loop until cancellation.
    pub async fn run(mut self) {
        log::info!(
            "[Scheduler] Session {} running (composite={}ms, voice={}ms)",
            self.context.session_id,
            self.config.composite_interval_ms,
            self.config.voice_interval_ms
        );

        let mut poll = interval(self.config.poll_step());
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.final_flush().await;
                    break;
                }
                _ = poll.tick() => {
                    let now = Instant::now();
                    if self.inactivity_flush_due(now) {
                        log::info!(
                            "[Scheduler] Audio inactive for session {}; flushing {} buffered chunk(s)",
                            self.context.session_id,
                            self.audio.len()
                        );
                        self.run_voice().await;
                        self.audio.clear();
                    }
                    if now.duration_since(self.last_composite) >= self.config.composite_interval() {
                        self.composite_tick(now).await;
                        self.last_composite = now;
                        self.cycle_counter += 1;
                    }
                }
            }
        }

        self.intake.close();
        log::info!("[Scheduler] Session {} exited", self.context.session_id);
    }

    /// One composite tick: dispatch detectors, refresh state, emit a sample.
    async fn composite_tick(&mut self, now: Instant) {
        if let Some(frame) = self.intake.drain_latest_video() {
            self.run_visual(frame).await;
        }

        for chunk in self.intake.drain_all_audio() {
            let level = rms(&chunk.samples);
            if level < AUDIO_MIN_RMS {
                log::debug!(
                    "[Scheduler] Discarding near-silent chunk for session {} (rms={:.6})",
                    self.context.session_id,
                    level
                );
                continue;
            }
            self.audio.append(chunk);
        }

        if let Some(started) = self.audio.started_at() {
            let due = now.duration_since(started).as_millis() as u64 / self.config.voice_interval_ms;
            // First buffered audio is analyzed on the tick it arrives rather
            // than waiting out a full voice interval.
            if (due > self.voice_analyses_done || self.voice_runs == 0) && !self.audio.is_empty() {
                self.run_voice().await;
                self.voice_analyses_done = due;
            }
        }

        if !self.audio.is_empty()
            && self.audio_idle(now) > Duration::from_millis(self.config.audio_inactivity_flush_ms)
        {
            self.run_voice().await;
            self.audio.clear();
        }

        if self.audio.is_empty()
            && self.audio_idle(now) > Duration::from_millis(self.config.audio_silence_declare_ms)
        {
            self.states.voice = Some(Stamped::new(VoiceObservation::no_audio(), now_millis()));
        }

        self.emit_sample().await;
    }

    /// Dispatches the rotation-selected visual detector on a frame.
    ///
    /// Cold start: a modality that has never produced an observation also
    /// runs on this frame rather than waiting up to two full rotations for
    /// its first value. After the first frame-bearing tick, strictly one
    /// visual detector runs per tick.
    async fn run_visual(&mut self, frame: VideoFrame) {
        match rotation_slot(self.cycle_counter) {
            VisualSlot::Face => self.run_face(frame.clone()).await,
            VisualSlot::Hand => self.run_hand(frame.clone()).await,
            VisualSlot::Eye => self.run_eye(frame.clone()).await,
        }
        if self.states.face.is_none() {
            self.run_face(frame.clone()).await;
        }
        if self.states.hand.is_none() {
            self.run_hand(frame.clone()).await;
        }
        if self.states.eye.is_none() {
            self.run_eye(frame).await;
        }
    }

    async fn run_face(&mut self, frame: VideoFrame) {
        let detector = Arc::clone(&self.detectors.face);
        let observation = self
            .run_detector("face", move || detector.analyze(&frame), FaceObservation::fault)
            .await;
        self.states.face = Some(Stamped::new(observation, now_millis()));
    }

    async fn run_hand(&mut self, frame: VideoFrame) {
        let detector = Arc::clone(&self.detectors.hand);
        let observation = self
            .run_detector("hand", move || detector.analyze(&frame), HandObservation::fault)
            .await;
        self.states.hand = Some(Stamped::new(observation, now_millis()));
    }

    async fn run_eye(&mut self, frame: VideoFrame) {
        let detector = Arc::clone(&self.detectors.eye);
        let observation = self
            .run_detector("eye", move || detector.analyze(&frame), EyeObservation::fault)
            .await;
        self.states.eye = Some(Stamped::new(observation, now_millis()));
    }

    /// Runs the voice detector on the current window, if any.
    async fn run_voice(&mut self) {
        let window = self.audio.extract_window();
        if window.is_empty() {
            return;
        }
        let detector = Arc::clone(&self.detectors.voice);
        let observation = self
            .run_detector("voice", move || detector.analyze(&window), VoiceObservation::fault)
            .await;
        self.states.voice = Some(Stamped::new(observation, now_millis()));
        self.voice_runs += 1;
    }

    /// Runs one detector invocation on the blocking pool.
    ///
    /// A panicking detector maps to the modality's fault observation; an
    /// invocation past the soft deadline is logged but its result is used.
    async fn run_detector<T, F>(&self, name: &str, job: F, fault: fn() -> T) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let started = Instant::now();
        let result = tokio::task::spawn_blocking(job).await;
        let elapsed = started.elapsed();
        if elapsed > Duration::from_millis(DETECTOR_SOFT_DEADLINE_MS) {
            log::warn!(
                "[Scheduler] {} detector exceeded soft deadline for session {} ({}ms)",
                name,
                self.context.session_id,
                elapsed.as_millis()
            );
        }
        result.unwrap_or_else(|e| {
            log::error!(
                "[Scheduler] {} detector fault for session {}: {}",
                name,
                self.context.session_id,
                e
            );
            fault()
        })
    }

    /// Time since audio was last offered (or since session start if never).
    fn audio_idle(&self, now: Instant) -> Duration {
        let reference = self.intake.last_audio_at().unwrap_or(self.session_started);
        now.duration_since(reference)
    }

    /// Whether a between-tick inactivity flush is due.
    fn inactivity_flush_due(&self, now: Instant) -> bool {
        !self.audio.is_empty()
            && self.audio_idle(now) > Duration::from_millis(self.config.audio_inactivity_flush_ms)
    }

    /// Canonicalizes current state and hands the sample to the publisher.
    async fn emit_sample(&mut self) {
        let ts = now_millis().max(self.last_emit_ts + 1);
        self.last_emit_ts = ts;
        let sample = canonicalize(&self.context, &self.states, ts);
        *self.last_sample.write() = Some(sample.clone());
        self.publisher.publish(sample).await;
    }

    /// Terminal tick on cancellation: one last voice analysis over the
    /// remaining buffer, then the session-stopped sample.
    ///
    /// The terminal state keeps the emotion of the last analysis so the
    /// final partial window of audio still counts in aggregation; only the
    /// level and method are marked `session_stopped`.
    async fn final_flush(&mut self) {
        log::info!(
            "[Scheduler] Final flush for session {} ({} buffered chunk(s))",
            self.context.session_id,
            self.audio.len()
        );
        if !self.audio.is_empty() {
            self.run_voice().await;
            self.audio.clear();
        }
        let terminal = match self.states.voice.take() {
            Some(stamped) => VoiceObservation {
                confidence_level: ConfidenceLevel::SessionStopped,
                emotion: stamped.observation.emotion,
                confidence: stamped.observation.confidence,
                method: "session_stopped".to_string(),
            },
            None => VoiceObservation::session_stopped(),
        };
        self.states.voice = Some(Stamped::new(terminal, now_millis()));
        self.emit_sample().await;
    }
}
