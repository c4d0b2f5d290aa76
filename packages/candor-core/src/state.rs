//! Core application state and configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    AUDIO_INACTIVITY_FLUSH_MS, AUDIO_QUEUE_CAPACITY, AUDIO_SILENCE_DECLARE_MS, AUDIO_WINDOW_MS,
    COMPOSITE_INTERVAL_MS, EVENT_CHANNEL_CAPACITY, POLL_STEP_MS, STOP_DEADLINE_MS,
    VIDEO_QUEUE_CAPACITY, VOICE_INTERVAL_MS,
};

/// Configuration for the per-session analysis engine.
///
/// Groups the cadence and capacity parameters the scheduler runs on. The
/// defaults are the contract values from `protocol_constants`; tests shrink
/// them where paused time is not enough.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Interval between composite sample emissions (ms).
    pub composite_interval_ms: u64,

    /// Interval between voice analyses relative to the first audio chunk (ms).
    pub voice_interval_ms: u64,

    /// Scheduler wake granularity (ms).
    pub poll_step_ms: u64,

    /// Capacity of the video intake queue.
    pub video_queue_capacity: usize,

    /// Capacity of the audio intake queue.
    pub audio_queue_capacity: usize,

    /// Sliding audio window retained for voice analysis (ms).
    pub audio_window_ms: u64,

    /// Silence after which the buffer is flushed through one last analysis (ms).
    pub audio_inactivity_flush_ms: u64,

    /// Silence after which the voice modality is declared `no_audio` (ms).
    pub audio_silence_declare_ms: u64,

    /// Graceful-stop deadline including the final flush (ms).
    pub stop_deadline_ms: u64,
}

impl EngineConfig {
    /// Creates a new `EngineConfig` with validated values.
    ///
    /// # Errors
    ///
    /// Returns an error if any value would stall or livelock the scheduler.
    pub fn new(composite_interval_ms: u64, voice_interval_ms: u64) -> Result<Self, String> {
        let config = Self {
            composite_interval_ms,
            voice_interval_ms,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.composite_interval_ms == 0 {
            return Err("composite_interval_ms must be >= 1".to_string());
        }
        if self.voice_interval_ms == 0 {
            return Err("voice_interval_ms must be >= 1".to_string());
        }
        if self.poll_step_ms == 0 {
            return Err("poll_step_ms must be >= 1 (interval panics on zero)".to_string());
        }
        if self.poll_step_ms > self.composite_interval_ms {
            return Err("poll_step_ms must not exceed composite_interval_ms".to_string());
        }
        if self.video_queue_capacity == 0 || self.audio_queue_capacity == 0 {
            return Err("intake queue capacities must be >= 1".to_string());
        }
        Ok(())
    }

    /// Composite cadence as a [`Duration`].
    pub fn composite_interval(&self) -> Duration {
        Duration::from_millis(self.composite_interval_ms)
    }

    /// Voice cadence as a [`Duration`].
    pub fn voice_interval(&self) -> Duration {
        Duration::from_millis(self.voice_interval_ms)
    }

    /// Poll step as a [`Duration`].
    pub fn poll_step(&self) -> Duration {
        Duration::from_millis(self.poll_step_ms)
    }

    /// Stop deadline as a [`Duration`].
    pub fn stop_deadline(&self) -> Duration {
        Duration::from_millis(self.stop_deadline_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            composite_interval_ms: COMPOSITE_INTERVAL_MS,
            voice_interval_ms: VOICE_INTERVAL_MS,
            poll_step_ms: POLL_STEP_MS,
            video_queue_capacity: VIDEO_QUEUE_CAPACITY,
            audio_queue_capacity: AUDIO_QUEUE_CAPACITY,
            audio_window_ms: AUDIO_WINDOW_MS,
            audio_inactivity_flush_ms: AUDIO_INACTIVITY_FLUSH_MS,
            audio_silence_declare_ms: AUDIO_SILENCE_DECLARE_MS,
            stop_deadline_ms: STOP_DEADLINE_MS,
        }
    }
}

/// Configuration for the Candor application.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    // Server
    /// Preferred port for the HTTP/WS server (0 = auto-allocate).
    pub preferred_port: u16,

    // Engine
    /// Per-session analysis engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    // WebSocket
    /// Capacity of the event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 0,
            engine: EngineConfig::default(),
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_composite_interval_rejected() {
        assert!(EngineConfig::new(0, 5_000).is_err());
    }

    #[test]
    fn poll_step_longer_than_composite_rejected() {
        let config = EngineConfig {
            composite_interval_ms: 100,
            poll_step_ms: 500,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn custom_intervals_accepted() {
        let config = EngineConfig::new(10_000, 5_000).unwrap();
        assert_eq!(config.composite_interval(), Duration::from_secs(10));
        assert_eq!(config.voice_interval(), Duration::from_secs(5));
    }
}
