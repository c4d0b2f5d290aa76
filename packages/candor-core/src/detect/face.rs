//! Heuristic facial stress detector.

use crate::media::VideoFrame;

use super::vision::{edge_energy, luminance_stats, skin_ratio, Region};
use super::{Emotion, FaceDetector, FaceObservation, StressLevel};

/// Minimum skin fraction in the portrait region to accept a face.
const FACE_SKIN_THRESHOLD: f32 = 0.18;

/// Minimum whole-frame skin fraction for the loose fallback scan.
const FALLBACK_SKIN_THRESHOLD: f32 = 0.05;

/// Luminance spread above which facial texture reads as tense.
const STRESS_STD_THRESHOLD: f32 = 55.0;

/// Edge energy above which micro-expression activity reads as tense.
const STRESS_EDGE_THRESHOLD: f32 = 28.0;

/// Stress classifier built from pixel statistics of the portrait region.
///
/// Strategy chain: a portrait-region scan that requires a plausible face,
/// then a loose whole-frame scan. Frames with neither yield `Unknown`.
pub struct HeuristicFaceDetector;

impl HeuristicFaceDetector {
    pub fn new() -> Self {
        Self
    }

    /// Primary strategy: the centered portrait region must look like a face.
    fn portrait_scan(&self, frame: &VideoFrame) -> Option<FaceObservation> {
        let portrait = Region::fraction(frame, 0.25, 0.1, 0.75, 0.65);
        if skin_ratio(frame, portrait) < FACE_SKIN_THRESHOLD {
            return None;
        }
        Some(self.classify(frame, portrait, 1, "portrait_scan"))
    }

    /// Fallback: accept any frame with enough skin tone somewhere.
    fn loose_scan(&self, frame: &VideoFrame) -> Option<FaceObservation> {
        let full = Region::full(frame);
        if skin_ratio(frame, full) < FALLBACK_SKIN_THRESHOLD {
            return None;
        }
        let mut observation = self.classify(frame, full, 1, "loose_scan");
        observation.confidence *= 0.6;
        Some(observation)
    }

    fn classify(
        &self,
        frame: &VideoFrame,
        region: Region,
        faces: u32,
        method: &str,
    ) -> FaceObservation {
        let stats = luminance_stats(frame, region);
        let edges = edge_energy(frame, region);

        let stress_score = (stats.std_dev / STRESS_STD_THRESHOLD + edges / STRESS_EDGE_THRESHOLD)
            / 2.0;
        let (stress_level, emotion, confidence) = if stress_score >= 1.0 {
            (
                StressLevel::Stress,
                Emotion::Stressed,
                (stress_score - 1.0).min(1.0) * 0.5 + 0.5,
            )
        } else {
            (
                StressLevel::NonStress,
                if stress_score < 0.4 {
                    Emotion::Calm
                } else {
                    Emotion::Neutral
                },
                (1.0 - stress_score).min(1.0) * 0.5 + 0.5,
            )
        };

        FaceObservation {
            stress_level,
            emotion,
            confidence,
            faces_detected: faces,
            method: method.to_string(),
        }
    }
}

impl Default for HeuristicFaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceDetector for HeuristicFaceDetector {
    fn analyze(&self, frame: &VideoFrame) -> FaceObservation {
        if frame.pixels.is_empty() {
            return FaceObservation::fault();
        }
        self.portrait_scan(frame)
            .or_else(|| self.loose_scan(frame))
            .unwrap_or_else(|| FaceObservation::unknown("no_face_found"))
    }
}
