//! Detector contracts and the heuristic implementations behind them.
//!
//! Each modality is a trait so model-backed detectors can be swapped in
//! without touching the scheduler; the bundled implementations are
//! deterministic heuristics (pixel-statistics scans for the visual
//! modalities, energy/spectral rules for voice). Detectors never propagate
//! failures: degenerate input maps to the modality's "unknown" observation
//! with zero confidence.
//!
//! Implementations follow a fallback chain: an ordered list of strategies is
//! attempted and the first one that yields a non-unknown classification
//! wins. Which strategy fired is recorded in the observation's `method` tag.

mod face;
mod eye;
mod hand;
mod vision;
mod voice;

pub use face::HeuristicFaceDetector;
pub use eye::HeuristicEyeDetector;
pub use hand::HeuristicHandDetector;
pub use voice::HeuristicVoiceDetector;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::media::{AudioWindow, VideoFrame};

// ─────────────────────────────────────────────────────────────────────────────
// Classification Levels
// ─────────────────────────────────────────────────────────────────────────────

/// Facial stress classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    /// Visible stress indicators.
    Stress,
    /// No stress indicators.
    NonStress,
    /// Nothing classifiable (no face, detector fault, no data yet).
    #[default]
    Unknown,
}

/// Confidence classification shared by the eye, hand, and voice modalities.
///
/// The binarization contract treats every `*Confident` level except
/// [`NotConfident`](Self::NotConfident) as confident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryConfident,
    Confident,
    SomewhatConfident,
    NotConfident,
    /// No face present in the frame.
    NoFace,
    /// Face present but eyes not locatable.
    NoEyes,
    /// No hands present in the frame.
    NoHands,
    /// No audio received.
    NoAudio,
    /// Session terminated; emitted only on the final flush.
    SessionStopped,
    /// Nothing classifiable yet.
    #[default]
    Unknown,
}

impl ConfidenceLevel {
    /// Whether this level counts as confident in the binary envelope.
    pub fn is_confident(self) -> bool {
        matches!(
            self,
            Self::VeryConfident | Self::Confident | Self::SomewhatConfident
        )
    }
}

/// Emotion label attached to face and voice observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Happy,
    Calm,
    Neutral,
    Angry,
    Sad,
    Fearful,
    Fear,
    Stressed,
    Disgust,
    Surprised,
    NoAudio,
    SessionStopped,
    #[default]
    Unknown,
}

impl Emotion {
    /// Emotions that count as confident in the voice binary envelope.
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Happy | Self::Calm | Self::Neutral)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Observations
// ─────────────────────────────────────────────────────────────────────────────

/// Output of a face stress analysis.
#[derive(Debug, Clone)]
pub struct FaceObservation {
    pub stress_level: StressLevel,
    pub emotion: Emotion,
    /// Classifier confidence in [0, 1].
    pub confidence: f32,
    pub faces_detected: u32,
    /// Which strategy produced the observation.
    pub method: String,
}

impl FaceObservation {
    /// Observation for a detector fault.
    pub fn fault() -> Self {
        Self {
            stress_level: StressLevel::Unknown,
            emotion: Emotion::Unknown,
            confidence: 0.0,
            faces_detected: 0,
            method: "error".to_string(),
        }
    }

    /// Observation for a frame with no classifiable face.
    pub fn unknown(method: &str) -> Self {
        Self {
            stress_level: StressLevel::Unknown,
            emotion: Emotion::Unknown,
            confidence: 0.0,
            faces_detected: 0,
            method: method.to_string(),
        }
    }
}

/// Output of an eye-gaze confidence analysis.
#[derive(Debug, Clone)]
pub struct EyeObservation {
    pub confidence_level: ConfidenceLevel,
    /// Classifier confidence in [0, 1].
    pub confidence: f32,
    pub eyes_detected: u32,
    pub faces_detected: u32,
    pub method: String,
}

impl EyeObservation {
    pub fn fault() -> Self {
        Self {
            confidence_level: ConfidenceLevel::Unknown,
            confidence: 0.0,
            eyes_detected: 0,
            faces_detected: 0,
            method: "error".to_string(),
        }
    }
}

/// Output of a hand-pose confidence analysis.
#[derive(Debug, Clone)]
pub struct HandObservation {
    pub confidence_level: ConfidenceLevel,
    /// Classifier confidence in [0, 1].
    pub confidence: f32,
    pub hands_detected: u32,
    /// Gesture labels recognized in the frame.
    pub gestures_detected: Vec<String>,
    pub method: String,
}

impl HandObservation {
    pub fn fault() -> Self {
        Self {
            confidence_level: ConfidenceLevel::Unknown,
            confidence: 0.0,
            hands_detected: 0,
            gestures_detected: Vec::new(),
            method: "error".to_string(),
        }
    }
}

/// Output of a vocal-emotion confidence analysis.
#[derive(Debug, Clone)]
pub struct VoiceObservation {
    pub confidence_level: ConfidenceLevel,
    pub emotion: Emotion,
    /// Classifier confidence in [0, 1].
    pub confidence: f32,
    pub method: String,
}

impl VoiceObservation {
    pub fn fault() -> Self {
        Self {
            confidence_level: ConfidenceLevel::Unknown,
            emotion: Emotion::Unknown,
            confidence: 0.0,
            method: "error".to_string(),
        }
    }

    /// State after the silence threshold with nothing buffered.
    pub fn no_audio() -> Self {
        Self {
            confidence_level: ConfidenceLevel::NoAudio,
            emotion: Emotion::NoAudio,
            confidence: 0.0,
            method: "no_audio_detected".to_string(),
        }
    }

    /// Terminal state stamped on the final flush sample.
    pub fn session_stopped() -> Self {
        Self {
            confidence_level: ConfidenceLevel::SessionStopped,
            emotion: Emotion::SessionStopped,
            confidence: 0.0,
            method: "session_stopped".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Detector Traits
// ─────────────────────────────────────────────────────────────────────────────

/// Facial stress inference on a single frame.
///
/// Implementations must be re-entrant: the same instance is shared across
/// sessions and called concurrently. Two calls with identical input must
/// produce identical output.
pub trait FaceDetector: Send + Sync {
    fn analyze(&self, frame: &VideoFrame) -> FaceObservation;
}

/// Eye-gaze confidence inference on a single frame.
pub trait EyeDetector: Send + Sync {
    fn analyze(&self, frame: &VideoFrame) -> EyeObservation;
}

/// Hand-pose confidence inference on a single frame.
pub trait HandDetector: Send + Sync {
    fn analyze(&self, frame: &VideoFrame) -> HandObservation;
}

/// Vocal-emotion confidence inference on an audio window.
pub trait VoiceDetector: Send + Sync {
    fn analyze(&self, window: &AudioWindow) -> VoiceObservation;
}

/// The four shared detector instances a session scheduler runs against.
#[derive(Clone)]
pub struct DetectorSet {
    pub face: Arc<dyn FaceDetector>,
    pub eye: Arc<dyn EyeDetector>,
    pub hand: Arc<dyn HandDetector>,
    pub voice: Arc<dyn VoiceDetector>,
}

impl DetectorSet {
    /// The bundled heuristic detectors.
    pub fn heuristic() -> Self {
        Self {
            face: Arc::new(HeuristicFaceDetector::new()),
            eye: Arc::new(HeuristicEyeDetector::new()),
            hand: Arc::new(HeuristicHandDetector::new()),
            voice: Arc::new(HeuristicVoiceDetector::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confident_levels_match_binarization_contract() {
        assert!(ConfidenceLevel::VeryConfident.is_confident());
        assert!(ConfidenceLevel::Confident.is_confident());
        assert!(ConfidenceLevel::SomewhatConfident.is_confident());
        assert!(!ConfidenceLevel::NotConfident.is_confident());
        assert!(!ConfidenceLevel::NoFace.is_confident());
        assert!(!ConfidenceLevel::NoAudio.is_confident());
        assert!(!ConfidenceLevel::SessionStopped.is_confident());
        assert!(!ConfidenceLevel::Unknown.is_confident());
    }

    #[test]
    fn positive_emotions_are_exactly_the_good_set() {
        assert!(Emotion::Happy.is_positive());
        assert!(Emotion::Calm.is_positive());
        assert!(Emotion::Neutral.is_positive());
        for bad in [
            Emotion::Angry,
            Emotion::Sad,
            Emotion::Fearful,
            Emotion::Fear,
            Emotion::Stressed,
            Emotion::Disgust,
            Emotion::NoAudio,
            Emotion::SessionStopped,
            Emotion::Unknown,
        ] {
            assert!(!bad.is_positive(), "{bad:?} must not be positive");
        }
    }

    #[test]
    fn levels_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&ConfidenceLevel::NotConfident).unwrap(),
            "\"not_confident\""
        );
        assert_eq!(
            serde_json::to_string(&StressLevel::NonStress).unwrap(),
            "\"non_stress\""
        );
        assert_eq!(
            serde_json::to_string(&Emotion::NoAudio).unwrap(),
            "\"no_audio\""
        );
    }

    #[test]
    fn fault_observations_have_zero_confidence() {
        assert_eq!(FaceObservation::fault().confidence, 0.0);
        assert_eq!(EyeObservation::fault().confidence, 0.0);
        assert_eq!(HandObservation::fault().confidence, 0.0);
        assert_eq!(VoiceObservation::fault().confidence, 0.0);
        assert_eq!(VoiceObservation::fault().method, "error");
    }
}
