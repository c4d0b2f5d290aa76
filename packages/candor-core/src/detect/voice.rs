//! Heuristic vocal-emotion confidence detector.
//!
//! Feature extraction mirrors a classic speech-emotion pipeline: normalize,
//! then measure energy, volume, zero-crossing rate, silence ratio, spectral
//! centroid (FFT), and autocorrelation pitch. Emotion rules map the feature
//! vector to a label, and the label plus audio quality map to a confidence
//! level.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::media::AudioWindow;

use super::{ConfidenceLevel, Emotion, VoiceDetector, VoiceObservation};

/// Samples quieter than this (post-normalization) count as silence.
const SILENCE_AMPLITUDE: f32 = 0.01;

/// Longest segment analyzed by the FFT and pitch stages.
const ANALYSIS_SAMPLES: usize = 8192;

/// Voiced-pitch search range in Hz.
const PITCH_MIN_HZ: f32 = 60.0;
const PITCH_MAX_HZ: f32 = 400.0;

/// Minimum normalized autocorrelation peak to accept a pitch estimate.
const PITCH_MIN_CORRELATION: f32 = 0.5;

#[derive(Debug, Default)]
struct VoiceFeatures {
    energy: f32,
    volume: f32,
    zero_crossing_rate: f32,
    silence_ratio: f32,
    spectral_centroid: f32,
    /// 0.0 when no voiced pitch was found.
    pitch_mean: f32,
    pitch_std: f32,
}

/// Emotion-rule classifier over extracted audio features.
///
/// Strategy chain: spectral/pitch rules when a voiced pitch is present,
/// energy rules otherwise. Windows with neither speech energy nor pitch
/// yield `Unknown`.
pub struct HeuristicVoiceDetector;

impl HeuristicVoiceDetector {
    pub fn new() -> Self {
        Self
    }

    fn extract_features(&self, samples: &[f32], sample_rate: u32) -> VoiceFeatures {
        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        if peak <= f32::EPSILON {
            return VoiceFeatures {
                silence_ratio: 1.0,
                ..VoiceFeatures::default()
            };
        }
        let normalized: Vec<f32> = samples.iter().map(|s| s / peak).collect();

        let energy = normalized.iter().map(|s| s * s).sum::<f32>() / normalized.len() as f32;
        let volume = normalized.iter().map(|s| s.abs()).sum::<f32>() / normalized.len() as f32;

        let crossings = normalized
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        let zero_crossing_rate = crossings as f32 / normalized.len() as f32;

        let silent = normalized
            .iter()
            .filter(|s| s.abs() < SILENCE_AMPLITUDE)
            .count();
        let silence_ratio = silent as f32 / normalized.len() as f32;

        let spectral_centroid = self.spectral_centroid(&normalized, sample_rate);
        let (pitch_mean, pitch_std) = self.pitch_track(&normalized, sample_rate);

        VoiceFeatures {
            energy,
            volume,
            zero_crossing_rate,
            silence_ratio,
            spectral_centroid,
            pitch_mean,
            pitch_std,
        }
    }

    /// Magnitude-weighted mean frequency of the analysis segment.
    fn spectral_centroid(&self, samples: &[f32], sample_rate: u32) -> f32 {
        let len = samples.len().min(ANALYSIS_SAMPLES);
        if len < 16 {
            return 0.0;
        }
        let mut buffer: Vec<Complex<f32>> = samples[..len]
            .iter()
            .enumerate()
            .map(|(i, s)| {
                // Hann window
                let w = 0.5
                    - 0.5
                        * (2.0 * std::f32::consts::PI * i as f32 / (len - 1) as f32).cos();
                Complex::new(s * w, 0.0)
            })
            .collect();

        let mut planner = FftPlanner::new();
        planner.plan_fft_forward(len).process(&mut buffer);

        let bin_hz = sample_rate as f32 / len as f32;
        let mut weighted = 0.0f32;
        let mut total = 0.0f32;
        for (i, value) in buffer.iter().take(len / 2).enumerate() {
            let magnitude = value.norm();
            weighted += i as f32 * bin_hz * magnitude;
            total += magnitude;
        }
        if total > 0.0 {
            weighted / total
        } else {
            0.0
        }
    }

    /// Autocorrelation pitch over three sub-segments; (mean, std) in Hz,
    /// (0, 0) when no segment is voiced.
    fn pitch_track(&self, samples: &[f32], sample_rate: u32) -> (f32, f32) {
        let min_lag = (sample_rate as f32 / PITCH_MAX_HZ) as usize;
        let max_lag = (sample_rate as f32 / PITCH_MIN_HZ) as usize;
        let segment_len = (samples.len() / 3).min(ANALYSIS_SAMPLES);
        if segment_len <= max_lag * 2 || min_lag == 0 {
            // Fall back to a single segment when the window is short.
            return match self.pitch_of(samples, sample_rate, min_lag.max(1), max_lag) {
                Some(p) => (p, 0.0),
                None => (0.0, 0.0),
            };
        }

        let pitches: Vec<f32> = (0..3)
            .filter_map(|i| {
                let segment = &samples[i * segment_len..(i + 1) * segment_len];
                self.pitch_of(segment, sample_rate, min_lag.max(1), max_lag)
            })
            .collect();

        if pitches.is_empty() {
            return (0.0, 0.0);
        }
        let mean = pitches.iter().sum::<f32>() / pitches.len() as f32;
        let variance =
            pitches.iter().map(|p| (p - mean) * (p - mean)).sum::<f32>() / pitches.len() as f32;
        (mean, variance.sqrt())
    }

    fn pitch_of(
        &self,
        segment: &[f32],
        sample_rate: u32,
        min_lag: usize,
        max_lag: usize,
    ) -> Option<f32> {
        if segment.len() <= max_lag + 1 {
            return None;
        }
        let window = segment.len() - max_lag;
        let energy: f32 = segment[..window].iter().map(|s| s * s).sum();
        if energy <= f32::EPSILON {
            return None;
        }

        let mut best_lag = 0usize;
        let mut best_corr = 0.0f32;
        for lag in min_lag..=max_lag {
            let corr: f32 = (0..window).map(|i| segment[i] * segment[i + lag]).sum();
            let normalized = corr / energy;
            if normalized > best_corr {
                best_corr = normalized;
                best_lag = lag;
            }
        }

        (best_corr >= PITCH_MIN_CORRELATION && best_lag > 0)
            .then(|| sample_rate as f32 / best_lag as f32)
    }

    /// Primary strategy: emotion rules over pitch and energy features.
    fn spectral_rules(&self, features: &VoiceFeatures) -> Option<(Emotion, &'static str)> {
        if features.pitch_mean <= 0.0 {
            return None;
        }
        let emotion = if features.energy > 0.01
            && features.pitch_mean > 180.0
            && features.silence_ratio < 0.3
        {
            Emotion::Happy
        } else if features.energy > 0.015 && features.pitch_std > 60.0 {
            Emotion::Angry
        } else if features.pitch_mean > 220.0 && features.energy < 0.008 {
            Emotion::Fear
        } else if features.energy < 0.005
            && features.pitch_mean < 150.0
            && features.silence_ratio > 0.3
        {
            Emotion::Sad
        } else if (0.005..=0.01).contains(&features.energy)
            && features.pitch_std > 50.0
            && features.silence_ratio > 0.25
        {
            Emotion::Disgust
        } else {
            Emotion::Neutral
        };
        Some((emotion, "spectral_rules"))
    }

    /// Fallback: no voiced pitch, judge speech-likeness from energy and ZCR.
    fn energy_rules(&self, features: &VoiceFeatures) -> Option<(Emotion, &'static str)> {
        if features.energy > 0.01
            && (0.02..0.35).contains(&features.zero_crossing_rate)
            && features.silence_ratio < 0.6
        {
            Some((Emotion::Neutral, "energy_rules"))
        } else if features.volume > 0.0 && features.silence_ratio < 0.95 {
            Some((Emotion::Sad, "energy_rules"))
        } else {
            None
        }
    }

    fn score(&self, emotion: Emotion, features: &VoiceFeatures) -> f32 {
        let mut confidence: f32 = if emotion.is_positive() { 0.75 } else { 0.25 };
        if features.energy > 0.012 && features.volume > 0.1 {
            confidence += if emotion.is_positive() { 0.15 } else { 0.1 };
        } else if features.energy < 0.003 || features.volume < 0.02 {
            confidence -= 0.15;
        }
        confidence.clamp(0.1, 0.9)
    }

    fn level(&self, emotion: Emotion, confidence: f32) -> ConfidenceLevel {
        if emotion.is_positive() {
            if confidence >= 0.8 {
                ConfidenceLevel::VeryConfident
            } else if confidence >= 0.65 {
                ConfidenceLevel::Confident
            } else {
                ConfidenceLevel::SomewhatConfident
            }
        } else {
            ConfidenceLevel::NotConfident
        }
    }
}

impl Default for HeuristicVoiceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceDetector for HeuristicVoiceDetector {
    fn analyze(&self, window: &AudioWindow) -> VoiceObservation {
        if window.is_empty() || window.sample_rate == 0 {
            return VoiceObservation::no_audio();
        }

        let features = self.extract_features(&window.samples, window.sample_rate);
        let classified = self
            .spectral_rules(&features)
            .or_else(|| self.energy_rules(&features));

        let Some((emotion, method)) = classified else {
            return VoiceObservation {
                confidence_level: ConfidenceLevel::Unknown,
                emotion: Emotion::Unknown,
                confidence: 0.0,
                method: "no_speech_found".to_string(),
            };
        };

        let confidence = self.score(emotion, &features);
        VoiceObservation {
            confidence_level: self.level(emotion, confidence),
            emotion,
            confidence,
            method: method.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 22_050;

    fn window(samples: Vec<f32>) -> AudioWindow {
        AudioWindow {
            samples,
            sample_rate: RATE,
            chunk_count: 1,
        }
    }

    fn sine(freq: f32, secs: f32, amplitude: f32) -> Vec<f32> {
        let n = (secs * RATE as f32) as usize;
        (0..n)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin()
            })
            .collect()
    }

    #[test]
    fn empty_window_is_no_audio() {
        let detector = HeuristicVoiceDetector::new();
        let observation = detector.analyze(&window(vec![]));
        assert_eq!(observation.confidence_level, ConfidenceLevel::NoAudio);
        assert_eq!(observation.emotion, Emotion::NoAudio);
    }

    #[test]
    fn silent_window_is_unclassifiable() {
        let detector = HeuristicVoiceDetector::new();
        let observation = detector.analyze(&window(vec![0.0; RATE as usize]));
        assert_eq!(observation.confidence_level, ConfidenceLevel::Unknown);
        assert_eq!(observation.confidence, 0.0);
    }

    #[test]
    fn steady_high_tone_reads_happy_and_confident() {
        let detector = HeuristicVoiceDetector::new();
        let observation = detector.analyze(&window(sine(220.0, 2.0, 0.5)));
        assert_eq!(observation.emotion, Emotion::Happy);
        assert!(observation.confidence_level.is_confident());
        assert_eq!(observation.method, "spectral_rules");
    }

    #[test]
    fn low_tone_reads_neutral() {
        let detector = HeuristicVoiceDetector::new();
        // 120 Hz sits below the "happy" pitch gate; loud and steady → neutral.
        let observation = detector.analyze(&window(sine(120.0, 2.0, 0.5)));
        assert_eq!(observation.emotion, Emotion::Neutral);
        assert!(observation.confidence_level.is_confident());
    }

    #[test]
    fn pitchless_noise_reads_not_confident() {
        let detector = HeuristicVoiceDetector::new();
        // Deterministic LCG noise: no voiced pitch, ZCR far above speech range.
        let mut state = 0x2545f491u32;
        let samples: Vec<f32> = (0..RATE as usize)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state as f32 / u32::MAX as f32) - 0.5
            })
            .collect();
        let observation = detector.analyze(&window(samples));
        assert_eq!(observation.confidence_level, ConfidenceLevel::NotConfident);
        assert_eq!(observation.method, "energy_rules");
    }

    #[test]
    fn identical_windows_produce_identical_observations() {
        let detector = HeuristicVoiceDetector::new();
        let w = window(sine(220.0, 1.0, 0.4));
        let a = detector.analyze(&w);
        let b = detector.analyze(&w);
        assert_eq!(a.emotion, b.emotion);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.confidence_level, b.confidence_level);
    }
}
