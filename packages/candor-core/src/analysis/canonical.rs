//! Projection of detector state into the canonical binary envelope.
//!
//! `canonicalize` is a pure function: identical inputs produce an identical
//! sample, including component timestamps. The binarization rules here are
//! the observable contract; detector backends can change freely as long as
//! their levels satisfy these projections.

use crate::detect::StressLevel;
use crate::session::SessionContext;

use super::{
    EyeConfidenceComponent, FaceStressComponent, HandConfidenceComponent, ModalityStates,
    OverallScores, Sample, VoiceConfidenceComponent,
};

/// Builds the canonical [`Sample`] for one composite tick.
///
/// `timestamp` is the emission timestamp; unobserved modalities fall back to
/// it for their component timestamp.
pub fn canonicalize(context: &SessionContext, states: &ModalityStates, timestamp: u64) -> Sample {
    let face = face_component(states, timestamp);
    let eye = eye_component(states, timestamp);
    let hand = hand_component(states, timestamp);
    let voice = voice_component(states, timestamp);
    let overall = overall_scores(states, &eye, &hand, &voice);

    Sample {
        session_id: context.session_id.clone(),
        user_id: context.user_id.clone(),
        job_role_id: context.job_role_id.clone(),
        timestamp,
        face_stress: face,
        eye_confidence: eye,
        hand_confidence: hand,
        voice_confidence: voice,
        overall,
    }
}

fn face_component(states: &ModalityStates, fallback_ts: u64) -> FaceStressComponent {
    match &states.face {
        Some(stamped) => {
            let o = &stamped.observation;
            FaceStressComponent {
                stress: (o.stress_level == StressLevel::Stress) as u8,
                stress_level: o.stress_level,
                emotion: o.emotion,
                emotion_confidence: o.confidence,
                faces_detected: o.faces_detected,
                method: o.method.clone(),
                timestamp: stamped.timestamp,
            }
        }
        None => FaceStressComponent {
            timestamp: fallback_ts,
            ..FaceStressComponent::default()
        },
    }
}

fn eye_component(states: &ModalityStates, fallback_ts: u64) -> EyeConfidenceComponent {
    match &states.eye {
        Some(stamped) => {
            let o = &stamped.observation;
            EyeConfidenceComponent {
                confidence: o.confidence_level.is_confident() as u8,
                confidence_level: o.confidence_level,
                eyes_detected: o.eyes_detected,
                faces_detected: o.faces_detected,
                method: o.method.clone(),
                timestamp: stamped.timestamp,
            }
        }
        None => EyeConfidenceComponent {
            timestamp: fallback_ts,
            ..EyeConfidenceComponent::default()
        },
    }
}

fn hand_component(states: &ModalityStates, fallback_ts: u64) -> HandConfidenceComponent {
    match &states.hand {
        Some(stamped) => {
            let o = &stamped.observation;
            HandConfidenceComponent {
                confidence: o.confidence_level.is_confident() as u8,
                confidence_level: o.confidence_level,
                hands_detected: o.hands_detected,
                gestures_detected: o.gestures_detected.clone(),
                method: o.method.clone(),
                timestamp: stamped.timestamp,
            }
        }
        None => HandConfidenceComponent {
            timestamp: fallback_ts,
            ..HandConfidenceComponent::default()
        },
    }
}

fn voice_component(states: &ModalityStates, fallback_ts: u64) -> VoiceConfidenceComponent {
    match &states.voice {
        Some(stamped) => {
            let o = &stamped.observation;
            let confident = o.confidence_level.is_confident() || o.emotion.is_positive();
            VoiceConfidenceComponent {
                confidence: confident as u8,
                confidence_level: o.confidence_level,
                emotion: o.emotion,
                method: o.method.clone(),
                timestamp: stamped.timestamp,
            }
        }
        None => VoiceConfidenceComponent {
            timestamp: fallback_ts,
            ..VoiceConfidenceComponent::default()
        },
    }
}

/// Equal-weight mean of the binary confidence values over observed
/// modalities, plus the face-derived stress score.
fn overall_scores(
    states: &ModalityStates,
    eye: &EyeConfidenceComponent,
    hand: &HandConfidenceComponent,
    voice: &VoiceConfidenceComponent,
) -> OverallScores {
    let mut binaries = Vec::with_capacity(3);
    if states.eye.is_some() {
        binaries.push(eye.confidence as f32);
    }
    if states.hand.is_some() {
        binaries.push(hand.confidence as f32);
    }
    if states.voice.is_some() {
        binaries.push(voice.confidence as f32);
    }

    let confidence_score = if binaries.is_empty() {
        0.5
    } else {
        binaries.iter().sum::<f32>() / binaries.len() as f32
    };

    let stress_score = match &states.face {
        Some(stamped) => match stamped.observation.stress_level {
            StressLevel::Stress => stamped.observation.confidence,
            StressLevel::NonStress => 1.0 - stamped.observation.confidence,
            StressLevel::Unknown => 0.5,
        },
        None => 0.5,
    };

    OverallScores {
        confidence_score,
        stress_score,
        components_used: binaries.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{
        ConfidenceLevel, Emotion, EyeObservation, FaceObservation, HandObservation, StressLevel,
        VoiceObservation,
    };
    use crate::analysis::Stamped;

    fn context() -> SessionContext {
        SessionContext {
            session_id: "s1".to_string(),
            user_id: "u1".to_string(),
            job_role_id: Some("r1".to_string()),
        }
    }

    fn face(level: StressLevel, confidence: f32) -> Stamped<FaceObservation> {
        Stamped::new(
            FaceObservation {
                stress_level: level,
                emotion: Emotion::Neutral,
                confidence,
                faces_detected: 1,
                method: "portrait_scan".to_string(),
            },
            100,
        )
    }

    fn eye(level: ConfidenceLevel) -> Stamped<EyeObservation> {
        Stamped::new(
            EyeObservation {
                confidence_level: level,
                confidence: 0.8,
                eyes_detected: 2,
                faces_detected: 1,
                method: "eye_band_scan".to_string(),
            },
            110,
        )
    }

    fn hand(level: ConfidenceLevel) -> Stamped<HandObservation> {
        Stamped::new(
            HandObservation {
                confidence_level: level,
                confidence: 0.7,
                hands_detected: 2,
                gestures_detected: vec!["steady_hands".to_string()],
                method: "skin_band_scan".to_string(),
            },
            120,
        )
    }

    fn voice(level: ConfidenceLevel, emotion: Emotion) -> Stamped<VoiceObservation> {
        Stamped::new(
            VoiceObservation {
                confidence_level: level,
                emotion,
                confidence: 0.75,
                method: "spectral_rules".to_string(),
            },
            130,
        )
    }

    #[test]
    fn stress_binarizes_only_on_stress_level() {
        let mut states = ModalityStates::default();
        states.face = Some(face(StressLevel::Stress, 0.9));
        assert_eq!(canonicalize(&context(), &states, 1000).face_stress.stress, 1);

        states.face = Some(face(StressLevel::NonStress, 0.9));
        assert_eq!(canonicalize(&context(), &states, 1000).face_stress.stress, 0);

        states.face = Some(face(StressLevel::Unknown, 0.0));
        assert_eq!(canonicalize(&context(), &states, 1000).face_stress.stress, 0);
    }

    #[test]
    fn eye_and_hand_binarize_on_confident_levels() {
        let mut states = ModalityStates::default();
        states.eye = Some(eye(ConfidenceLevel::SomewhatConfident));
        states.hand = Some(hand(ConfidenceLevel::NotConfident));

        let sample = canonicalize(&context(), &states, 1000);
        assert_eq!(sample.eye_confidence.confidence, 1);
        assert_eq!(sample.hand_confidence.confidence, 0);
    }

    #[test]
    fn voice_binarizes_on_level_or_positive_emotion() {
        let mut states = ModalityStates::default();

        // Confident level, bad emotion → 1
        states.voice = Some(voice(ConfidenceLevel::Confident, Emotion::Angry));
        assert_eq!(
            canonicalize(&context(), &states, 1000).voice_confidence.confidence,
            1
        );

        // Unconfident level, good emotion → 1
        states.voice = Some(voice(ConfidenceLevel::NotConfident, Emotion::Calm));
        assert_eq!(
            canonicalize(&context(), &states, 1000).voice_confidence.confidence,
            1
        );

        // Unconfident level, bad emotion → 0
        states.voice = Some(voice(ConfidenceLevel::NotConfident, Emotion::Sad));
        assert_eq!(
            canonicalize(&context(), &states, 1000).voice_confidence.confidence,
            0
        );

        // session_stopped is never confident
        states.voice = Some(voice(ConfidenceLevel::SessionStopped, Emotion::SessionStopped));
        assert_eq!(
            canonicalize(&context(), &states, 1000).voice_confidence.confidence,
            0
        );
    }

    #[test]
    fn binary_fields_are_always_zero_or_one() {
        let mut states = ModalityStates::default();
        states.face = Some(face(StressLevel::Stress, 0.9));
        states.eye = Some(eye(ConfidenceLevel::Confident));
        states.hand = Some(hand(ConfidenceLevel::NoHands));
        states.voice = Some(voice(ConfidenceLevel::VeryConfident, Emotion::Happy));

        let sample = canonicalize(&context(), &states, 1000);
        for bit in [
            sample.face_stress.stress,
            sample.eye_confidence.confidence,
            sample.hand_confidence.confidence,
            sample.voice_confidence.confidence,
        ] {
            assert!(bit <= 1);
        }
    }

    #[test]
    fn component_timestamps_lag_sample_timestamp() {
        let mut states = ModalityStates::default();
        states.eye = Some(eye(ConfidenceLevel::Confident));

        let sample = canonicalize(&context(), &states, 5000);
        assert_eq!(sample.timestamp, 5000);
        assert_eq!(sample.eye_confidence.timestamp, 110);
        // Unobserved modalities fall back to the sample timestamp.
        assert_eq!(sample.face_stress.timestamp, 5000);
    }

    #[test]
    fn overall_mean_covers_only_observed_modalities() {
        let mut states = ModalityStates::default();
        let sample = canonicalize(&context(), &states, 1000);
        assert_eq!(sample.overall.confidence_score, 0.5);
        assert_eq!(sample.overall.components_used, 0);

        states.eye = Some(eye(ConfidenceLevel::Confident));
        states.voice = Some(voice(ConfidenceLevel::NotConfident, Emotion::Sad));
        let sample = canonicalize(&context(), &states, 1000);
        assert_eq!(sample.overall.components_used, 2);
        assert!((sample.overall.confidence_score - 0.5).abs() < 1e-6);

        states.hand = Some(hand(ConfidenceLevel::Confident));
        let sample = canonicalize(&context(), &states, 1000);
        assert!((sample.overall.confidence_score - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn stress_score_follows_face_confidence() {
        let mut states = ModalityStates::default();
        states.face = Some(face(StressLevel::Stress, 0.8));
        assert!((canonicalize(&context(), &states, 0).overall.stress_score - 0.8).abs() < 1e-6);

        states.face = Some(face(StressLevel::NonStress, 0.8));
        assert!(
            (canonicalize(&context(), &states, 0).overall.stress_score - 0.2).abs() < 1e-6
        );

        states.face = Some(face(StressLevel::Unknown, 0.0));
        assert_eq!(canonicalize(&context(), &states, 0).overall.stress_score, 0.5);
    }

    #[test]
    fn canonicalize_is_pure() {
        let mut states = ModalityStates::default();
        states.face = Some(face(StressLevel::Stress, 0.9));
        states.voice = Some(voice(ConfidenceLevel::Confident, Emotion::Happy));

        let a = canonicalize(&context(), &states, 777);
        let b = canonicalize(&context(), &states, 777);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
