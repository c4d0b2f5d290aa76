//! The canonical emission unit and the per-session analysis pipeline.
//!
//! - [`Sample`]: the binary-envelope emission every observer and aggregator
//!   consumes
//! - [`canonical`]: the pure projection from detector state to a `Sample`
//! - [`scheduler`]: the per-session cadence loop
//! - [`publisher`]: persistence + broadcast of emitted samples

pub mod canonical;
pub mod publisher;
pub mod scheduler;

pub use canonical::canonicalize;
pub use publisher::SamplePublisher;
pub use scheduler::SessionScheduler;

use serde::{Deserialize, Serialize};

use crate::detect::{
    ConfidenceLevel, Emotion, EyeObservation, FaceObservation, HandObservation, StressLevel,
    VoiceObservation,
};

/// An observation plus the Unix timestamp (ms) of the detector run that
/// produced it. Component timestamps may lag the sample timestamp: only one
/// visual modality runs per composite tick.
#[derive(Debug, Clone)]
pub struct Stamped<T> {
    pub observation: T,
    pub timestamp: u64,
}

impl<T> Stamped<T> {
    pub fn new(observation: T, timestamp: u64) -> Self {
        Self {
            observation,
            timestamp,
        }
    }
}

/// The modality state a scheduler carries between composite ticks.
///
/// `None` means the modality has never produced an observation this session;
/// the canonicalizer fills in unknown defaults and such modalities do not
/// participate in the overall confidence mean.
#[derive(Debug, Clone, Default)]
pub struct ModalityStates {
    pub face: Option<Stamped<FaceObservation>>,
    pub eye: Option<Stamped<EyeObservation>>,
    pub hand: Option<Stamped<HandObservation>>,
    pub voice: Option<Stamped<VoiceObservation>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Sample Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Binary face-stress component of a [`Sample`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FaceStressComponent {
    /// 1 iff stress was classified.
    pub stress: u8,
    /// The observed level, kept for context (`unknown` on faults/no data).
    pub stress_level: StressLevel,
    pub emotion: Emotion,
    pub emotion_confidence: f32,
    pub faces_detected: u32,
    pub method: String,
    /// Timestamp (ms) of the detector run that produced this component.
    pub timestamp: u64,
}

/// Binary eye-confidence component of a [`Sample`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EyeConfidenceComponent {
    /// 1 iff the observed level counts as confident.
    pub confidence: u8,
    pub confidence_level: ConfidenceLevel,
    pub eyes_detected: u32,
    pub faces_detected: u32,
    pub method: String,
    pub timestamp: u64,
}

/// Binary hand-confidence component of a [`Sample`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HandConfidenceComponent {
    /// 1 iff the observed level counts as confident.
    pub confidence: u8,
    pub confidence_level: ConfidenceLevel,
    pub hands_detected: u32,
    pub gestures_detected: Vec<String>,
    pub method: String,
    pub timestamp: u64,
}

/// Binary voice-confidence component of a [`Sample`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VoiceConfidenceComponent {
    /// 1 iff the observed level counts as confident or the emotion is in the
    /// positive set.
    pub confidence: u8,
    pub confidence_level: ConfidenceLevel,
    pub emotion: Emotion,
    pub method: String,
    pub timestamp: u64,
}

/// Continuous, informational overall scores attached to every sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallScores {
    /// Mean of the binary confidence values over observed modalities;
    /// 0.5 when none has observed yet.
    pub confidence_score: f32,
    /// Face-derived stress score; 0.5 when unknown.
    pub stress_score: f32,
    /// How many confidence modalities contributed to the mean.
    pub components_used: u32,
}

impl Default for OverallScores {
    fn default() -> Self {
        Self {
            confidence_score: 0.5,
            stress_score: 0.5,
            components_used: 0,
        }
    }
}

/// The canonical emission unit: one binary envelope per composite tick.
///
/// Invariants: every binary field is 0 or 1; `timestamp` is strictly
/// increasing per session; each component carries the timestamp of the
/// detector run it reflects.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Sample {
    pub session_id: String,
    pub user_id: String,
    pub job_role_id: Option<String>,
    /// Emission timestamp in Unix milliseconds.
    pub timestamp: u64,
    pub face_stress: FaceStressComponent,
    pub eye_confidence: EyeConfidenceComponent,
    pub hand_confidence: HandConfidenceComponent,
    pub voice_confidence: VoiceConfidenceComponent,
    pub overall: OverallScores,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sample_has_neutral_overall() {
        let sample = Sample::default();
        assert_eq!(sample.overall.confidence_score, 0.5);
        assert_eq!(sample.overall.stress_score, 0.5);
        assert_eq!(sample.overall.components_used, 0);
    }

    #[test]
    fn sample_serializes_with_snake_case_levels() {
        let sample = Sample::default();
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["face_stress"]["stress_level"], "unknown");
        assert_eq!(json["voice_confidence"]["confidence_level"], "unknown");
        assert_eq!(json["face_stress"]["stress"], 0);
    }
}
