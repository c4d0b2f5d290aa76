//! Heuristic hand-pose confidence detector.

use crate::media::VideoFrame;

use super::vision::{edge_energy, skin_ratio, Region};
use super::{ConfidenceLevel, HandDetector, HandObservation};

/// Minimum skin fraction in a side band to count a hand.
const HAND_SKIN_THRESHOLD: f32 = 0.12;

/// Edge energy below which a detected hand reads as steady.
const STEADY_EDGE_THRESHOLD: f32 = 20.0;

/// Skin fraction above which a hand reads as an open palm.
const OPEN_PALM_THRESHOLD: f32 = 0.35;

/// Hand classifier built from skin-region scans of the lower frame bands.
///
/// The lower left and lower right thirds are scanned for skin-tone regions
/// (interviewees gesture beside and below the face). Visible, steady hands
/// read as confident; no hands yields `NoHands`.
pub struct HeuristicHandDetector;

impl HeuristicHandDetector {
    pub fn new() -> Self {
        Self
    }

    fn scan_band(&self, frame: &VideoFrame, band: Region) -> Option<(f32, f32)> {
        let ratio = skin_ratio(frame, band);
        (ratio >= HAND_SKIN_THRESHOLD).then(|| (ratio, edge_energy(frame, band)))
    }
}

impl Default for HeuristicHandDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl HandDetector for HeuristicHandDetector {
    fn analyze(&self, frame: &VideoFrame) -> HandObservation {
        if frame.pixels.is_empty() {
            return HandObservation::fault();
        }

        let left_band = Region::fraction(frame, 0.0, 0.55, 0.35, 1.0);
        let right_band = Region::fraction(frame, 0.65, 0.55, 1.0, 1.0);

        let mut hands = 0u32;
        let mut gestures = Vec::new();
        let mut steady = true;
        let mut best_ratio = 0.0f32;

        for band in [left_band, right_band] {
            if let Some((ratio, edges)) = self.scan_band(frame, band) {
                hands += 1;
                best_ratio = best_ratio.max(ratio);
                if edges > STEADY_EDGE_THRESHOLD {
                    steady = false;
                }
                if ratio >= OPEN_PALM_THRESHOLD {
                    gestures.push("open_palm".to_string());
                }
            }
        }

        if hands == 0 {
            return HandObservation {
                confidence_level: ConfidenceLevel::NoHands,
                confidence: 0.0,
                hands_detected: 0,
                gestures_detected: Vec::new(),
                method: "skin_band_scan".to_string(),
            };
        }

        if steady {
            gestures.push("steady_hands".to_string());
        } else {
            gestures.push("fidgeting".to_string());
        }

        let (level, confidence) = if steady && hands == 2 {
            (ConfidenceLevel::Confident, 0.6 + best_ratio.min(0.5) * 0.6)
        } else if steady {
            (ConfidenceLevel::SomewhatConfident, 0.55 + best_ratio * 0.3)
        } else {
            (ConfidenceLevel::NotConfident, 0.5 + best_ratio * 0.3)
        };

        HandObservation {
            confidence_level: level,
            confidence: confidence.min(1.0),
            hands_detected: hands,
            gestures_detected: gestures,
            method: "skin_band_scan".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_bands(left_skin: bool, right_skin: bool, textured: bool) -> VideoFrame {
        let mut pixels = Vec::new();
        for y in 0..40u32 {
            for x in 0..40u32 {
                let in_left = x < 14 && y >= 22;
                let in_right = x >= 26 && y >= 22;
                let skin_here = (in_left && left_skin) || (in_right && right_skin);
                let rgb = if skin_here {
                    if textured && (x + y) % 2 == 0 {
                        (20u8, 20u8, 20u8)
                    } else {
                        (200u8, 140u8, 110u8)
                    }
                } else {
                    (40u8, 40u8, 60u8)
                };
                pixels.extend_from_slice(&[rgb.0, rgb.1, rgb.2]);
            }
        }
        VideoFrame::from_rgb8(40, 40, pixels)
    }

    #[test]
    fn no_hands_on_empty_bands() {
        let detector = HeuristicHandDetector::new();
        let observation = detector.analyze(&frame_with_bands(false, false, false));
        assert_eq!(observation.confidence_level, ConfidenceLevel::NoHands);
        assert_eq!(observation.hands_detected, 0);
        assert!(observation.gestures_detected.is_empty());
    }

    #[test]
    fn two_steady_hands_read_confident() {
        let detector = HeuristicHandDetector::new();
        let observation = detector.analyze(&frame_with_bands(true, true, false));
        assert_eq!(observation.confidence_level, ConfidenceLevel::Confident);
        assert_eq!(observation.hands_detected, 2);
        assert!(observation
            .gestures_detected
            .contains(&"steady_hands".to_string()));
        assert!(observation
            .gestures_detected
            .contains(&"open_palm".to_string()));
    }

    #[test]
    fn one_steady_hand_reads_somewhat_confident() {
        let detector = HeuristicHandDetector::new();
        let observation = detector.analyze(&frame_with_bands(true, false, false));
        assert_eq!(
            observation.confidence_level,
            ConfidenceLevel::SomewhatConfident
        );
        assert_eq!(observation.hands_detected, 1);
    }

    #[test]
    fn fidgeting_hands_read_not_confident() {
        let detector = HeuristicHandDetector::new();
        let observation = detector.analyze(&frame_with_bands(true, true, true));
        assert_eq!(observation.confidence_level, ConfidenceLevel::NotConfident);
        assert!(observation
            .gestures_detected
            .contains(&"fidgeting".to_string()));
    }
}
