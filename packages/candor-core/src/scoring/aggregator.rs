//! Post-session aggregation of persisted samples into final scores.

use std::sync::Arc;

use crate::analysis::Sample;
use crate::error::{CandorError, CandorResult};
use crate::scoring::{
    ComponentBreakdown, ConfidenceBand, ConfidenceBreakdown, FinalScore, JobRoleWeights,
    StressBand,
};
use crate::store::Store;
use crate::utils::now_millis;

/// Folds a closed session's persisted samples into a [`FinalScore`] under
/// job-role weights.
///
/// Idempotent: two runs over unchanged store state produce the same score
/// (modulo `computed_at`). Stored weights are applied as-given; only role
/// creation normalizes.
pub struct Aggregator {
    store: Arc<dyn Store>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Computes and persists the final score for a session.
    ///
    /// A missing job role (or `None`) falls back to the default equal split.
    /// A session with zero samples produces the zero-filled score rather
    /// than an error.
    pub async fn finalize(
        &self,
        session_id: &str,
        user_id: &str,
        job_role_id: Option<&str>,
    ) -> CandorResult<FinalScore> {
        let samples = self.store.list_samples(session_id).await?;

        let weights = match job_role_id {
            Some(id) => match self.store.get_job_role(id).await? {
                Some(role) => role.weights,
                None => {
                    log::warn!(
                        "[Aggregator] Job role {} not found for session {}; using default weights",
                        id,
                        session_id
                    );
                    JobRoleWeights::default()
                }
            },
            None => JobRoleWeights::default(),
        };

        let score = compute_final_score(
            session_id,
            user_id,
            job_role_id,
            &samples,
            weights,
        );

        self.store.persist_final_score(session_id, &score).await?;
        log::info!(
            "[Aggregator] Finalized session {}: confidence={:.2} ({:?}), stress={:.2} ({:?}), samples={}",
            session_id,
            score.overall_confidence,
            score.confidence_band,
            score.overall_stress,
            score.stress_band,
            score.samples_analyzed
        );
        Ok(score)
    }

    /// Reads the persisted final score for a session.
    pub async fn final_score(&self, session_id: &str) -> CandorResult<FinalScore> {
        self.store
            .get_final_score(session_id)
            .await?
            .ok_or_else(|| CandorError::SessionNotFound(session_id.to_string()))
    }
}

/// The pure aggregation law:
/// `overall_confidence = Σ (ratio_m × weight_m)` over voice/hand/eye, and
/// `overall_stress = stressed_samples / N × 100`.
fn compute_final_score(
    session_id: &str,
    user_id: &str,
    job_role_id: Option<&str>,
    samples: &[Sample],
    weights: JobRoleWeights,
) -> FinalScore {
    let n = samples.len();

    let (voice_ratio, hand_ratio, eye_ratio, stress_ratio) = if n == 0 {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        let count = |f: fn(&Sample) -> bool| samples.iter().filter(|s| f(s)).count() as f64;
        let total = n as f64;
        (
            count(|s| s.voice_confidence.confidence == 1) / total,
            count(|s| s.hand_confidence.confidence == 1) / total,
            count(|s| s.eye_confidence.confidence == 1) / total,
            count(|s| s.face_stress.stress == 1) / total,
        )
    };

    let breakdown = ConfidenceBreakdown {
        voice: ComponentBreakdown {
            ratio: voice_ratio,
            weight: weights.voice,
            contribution: voice_ratio * weights.voice / 100.0,
        },
        hand: ComponentBreakdown {
            ratio: hand_ratio,
            weight: weights.hand,
            contribution: hand_ratio * weights.hand / 100.0,
        },
        eye: ComponentBreakdown {
            ratio: eye_ratio,
            weight: weights.eye,
            contribution: eye_ratio * weights.eye / 100.0,
        },
    };

    let overall_confidence = (breakdown.voice.contribution
        + breakdown.hand.contribution
        + breakdown.eye.contribution)
        * 100.0;
    let overall_stress = stress_ratio * 100.0;

    FinalScore {
        session_id: session_id.to_string(),
        user_id: user_id.to_string(),
        job_role_id: job_role_id.map(str::to_string),
        confidence_breakdown: breakdown,
        overall_confidence,
        confidence_band: ConfidenceBand::of(overall_confidence),
        overall_stress,
        stress_band: StressBand::of(overall_stress),
        samples_analyzed: n,
        job_weights: weights,
        computed_at: now_millis(),
    }
}
