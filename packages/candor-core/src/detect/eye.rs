//! Heuristic eye-gaze confidence detector.

use crate::media::VideoFrame;

use super::vision::{luminance_stats, skin_ratio, Region};
use super::{ConfidenceLevel, EyeDetector, EyeObservation};

/// Minimum skin fraction in the portrait region to accept a face.
const FACE_SKIN_THRESHOLD: f32 = 0.18;

/// Minimum luminance spread in the eye band for open, locatable eyes.
/// Pupils and sclera produce strong local contrast; closed lids do not.
const EYE_CONTRAST_THRESHOLD: f32 = 18.0;

/// Left/right brightness imbalance above which gaze reads as averted.
const GAZE_IMBALANCE_THRESHOLD: f32 = 22.0;

/// Gaze classifier built from contrast statistics of the eye band.
///
/// Strategy chain: locate the face (portrait skin scan), then classify the
/// eye band by contrast and left/right symmetry. A face without eye contrast
/// yields `NoEyes`; no face yields `NoFace`.
pub struct HeuristicEyeDetector;

impl HeuristicEyeDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicEyeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EyeDetector for HeuristicEyeDetector {
    fn analyze(&self, frame: &VideoFrame) -> EyeObservation {
        if frame.pixels.is_empty() {
            return EyeObservation::fault();
        }

        let portrait = Region::fraction(frame, 0.25, 0.1, 0.75, 0.65);
        if skin_ratio(frame, portrait) < FACE_SKIN_THRESHOLD {
            return EyeObservation {
                confidence_level: ConfidenceLevel::NoFace,
                confidence: 0.0,
                eyes_detected: 0,
                faces_detected: 0,
                method: "portrait_scan".to_string(),
            };
        }

        // Eye band: the upper third of the portrait region, split in half.
        let left_eye = Region::fraction(frame, 0.28, 0.2, 0.5, 0.35);
        let right_eye = Region::fraction(frame, 0.5, 0.2, 0.72, 0.35);
        let left = luminance_stats(frame, left_eye);
        let right = luminance_stats(frame, right_eye);

        let contrast = (left.std_dev + right.std_dev) / 2.0;
        if contrast < EYE_CONTRAST_THRESHOLD {
            return EyeObservation {
                confidence_level: ConfidenceLevel::NoEyes,
                confidence: 0.0,
                eyes_detected: 0,
                faces_detected: 1,
                method: "eye_band_scan".to_string(),
            };
        }

        let imbalance = (left.mean - right.mean).abs();
        let (level, confidence) = if imbalance <= GAZE_IMBALANCE_THRESHOLD {
            let score =
                (contrast / (EYE_CONTRAST_THRESHOLD * 2.0)).min(1.0) * 0.5 + 0.5;
            if score >= 0.75 {
                (ConfidenceLevel::Confident, score)
            } else {
                (ConfidenceLevel::SomewhatConfident, score)
            }
        } else {
            let score = (imbalance / 255.0).min(1.0);
            (ConfidenceLevel::NotConfident, 0.5 + score * 0.3)
        };

        EyeObservation {
            confidence_level: level,
            confidence,
            eyes_detected: 2,
            faces_detected: 1,
            method: "eye_band_scan".to_string(),
        }
    }
}
