//! Fixed engine constants that define the emission contract.
//!
//! These values are part of the observable behavior (sample cadence, queue
//! capacities, flush thresholds). Changing them changes what clients and
//! aggregators see, so they live here rather than in tunable config.

// ─────────────────────────────────────────────────────────────────────────────
// Analysis Cadence
// ─────────────────────────────────────────────────────────────────────────────

/// Interval between composite sample emissions (milliseconds).
///
/// At most one sample is emitted per interval; the final flush on stop is
/// the only sample allowed to arrive sooner.
pub const COMPOSITE_INTERVAL_MS: u64 = 10_000;

/// Interval between voice analyses, relative to the first audio chunk
/// received (milliseconds).
pub const VOICE_INTERVAL_MS: u64 = 5_000;

/// Granularity of the scheduler's cadence checks (milliseconds).
///
/// The loop wakes this often to test whether a composite tick, an
/// inactivity flush, or cancellation is due.
pub const POLL_STEP_MS: u64 = 500;

// ─────────────────────────────────────────────────────────────────────────────
// Media Intake
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the per-session video frame queue.
///
/// Offers beyond this are discarded (drop-newest); analysis runs on a
/// 10-second cadence so retaining more frames only biases toward stale state.
pub const VIDEO_QUEUE_CAPACITY: usize = 10;

/// Capacity of the per-session audio chunk queue.
pub const AUDIO_QUEUE_CAPACITY: usize = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Audio Buffering
// ─────────────────────────────────────────────────────────────────────────────

/// Sliding window retained in the audio buffer (milliseconds).
///
/// Voice analysis always consumes the concatenation of chunks that arrived
/// within this window.
pub const AUDIO_WINDOW_MS: u64 = 5_000;

/// Silence after which the remaining buffer is analyzed once and cleared
/// (milliseconds).
pub const AUDIO_INACTIVITY_FLUSH_MS: u64 = 2_000;

/// Silence after which the voice modality is declared `no_audio`
/// (milliseconds). Applies from session start if no chunk ever arrives.
pub const AUDIO_SILENCE_DECLARE_MS: u64 = 5_000;

/// Chunks quieter than this RMS are treated as line noise and not buffered.
pub const AUDIO_MIN_RMS: f32 = 1e-3;

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle Deadlines
// ─────────────────────────────────────────────────────────────────────────────

/// Deadline for a graceful stop including the final flush (milliseconds).
/// Past this the scheduler task is abandoned.
pub const STOP_DEADLINE_MS: u64 = 2_000;

/// Soft deadline for a single detector invocation (milliseconds).
/// Exceeding calls still return; the overrun is only logged.
pub const DETECTOR_SOFT_DEADLINE_MS: u64 = 2_000;

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used in API metadata.
pub const APP_NAME: &str = "Candor";

/// Service identifier returned by the health endpoint.
///
/// Clients probe /health and expect this exact string to identify a valid
/// Candor engine.
pub const SERVICE_ID: &str = "candor-engine";

// ─────────────────────────────────────────────────────────────────────────────
// Event Channel
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the event broadcast channel for WebSocket clients.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;
