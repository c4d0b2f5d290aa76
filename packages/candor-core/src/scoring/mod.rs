//! Post-session scoring: job-role weights, final scores, and summaries.

mod aggregator;
mod summary;

pub use aggregator::Aggregator;
pub use summary::{summarize, SessionSummary, Trend};

use serde::{Deserialize, Serialize};

use crate::utils::now_millis;

// ─────────────────────────────────────────────────────────────────────────────
// Job Roles
// ─────────────────────────────────────────────────────────────────────────────

/// Per-modality weights applied when folding a session into a final score.
///
/// Weights are percentages expected to sum to 100. Roles created through
/// [`JobRole::create`] are normalized; roles written by other backends are
/// consumed as-given at finalization, so an unnormalized stored role can push
/// the overall confidence past 100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct JobRoleWeights {
    pub voice: f64,
    pub hand: f64,
    pub eye: f64,
}

impl JobRoleWeights {
    /// Scales the weights so they sum to 100. A zero sum falls back to the
    /// default split.
    pub fn normalized(self) -> Self {
        let total = self.voice + self.hand + self.eye;
        if total <= 0.0 {
            return Self::default();
        }
        if (total - 100.0).abs() < f64::EPSILON {
            return self;
        }
        Self {
            voice: self.voice / total * 100.0,
            hand: self.hand / total * 100.0,
            eye: self.eye / total * 100.0,
        }
    }
}

impl Default for JobRoleWeights {
    fn default() -> Self {
        Self {
            voice: 33.33,
            hand: 33.33,
            eye: 33.34,
        }
    }
}

/// A job role with its scoring weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRole {
    pub job_role_id: String,
    pub name: String,
    pub weights: JobRoleWeights,
    /// Unix timestamp (ms) of creation.
    pub created_at: u64,
}

impl JobRole {
    /// Creates a role with a fresh id and normalized weights.
    pub fn create(name: impl Into<String>, weights: JobRoleWeights) -> Self {
        Self {
            job_role_id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            weights: weights.normalized(),
            created_at: now_millis(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Final Scores
// ─────────────────────────────────────────────────────────────────────────────

/// Confidence band classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceBand {
    /// Band for an overall confidence in [0, 100] (values past 100 stay
    /// `VeryHigh`).
    pub fn of(score: f64) -> Self {
        if score >= 80.0 {
            Self::VeryHigh
        } else if score >= 60.0 {
            Self::High
        } else if score >= 40.0 {
            Self::Medium
        } else if score >= 20.0 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }
}

/// Stress band classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressBand {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl StressBand {
    /// Band for an overall stress in [0, 100].
    pub fn of(score: f64) -> Self {
        if score <= 20.0 {
            Self::VeryLow
        } else if score <= 40.0 {
            Self::Low
        } else if score <= 60.0 {
            Self::Medium
        } else if score <= 80.0 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }
}

/// One modality's share of the final confidence score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ComponentBreakdown {
    /// Fraction of samples where the modality was confident.
    pub ratio: f64,
    /// The job-role weight applied.
    pub weight: f64,
    /// `ratio * weight / 100`.
    pub contribution: f64,
}

/// Per-modality breakdown of the final confidence score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ConfidenceBreakdown {
    pub voice: ComponentBreakdown,
    pub hand: ComponentBreakdown,
    pub eye: ComponentBreakdown,
}

/// Final scores for a closed session; single-valued per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalScore {
    pub session_id: String,
    pub user_id: String,
    pub job_role_id: Option<String>,
    pub confidence_breakdown: ConfidenceBreakdown,
    /// `Σ ratio_m × weight_m` over the three confidence modalities.
    pub overall_confidence: f64,
    pub confidence_band: ConfidenceBand,
    /// Percentage of samples with face stress set.
    pub overall_stress: f64,
    pub stress_band: StressBand,
    pub samples_analyzed: usize,
    pub job_weights: JobRoleWeights,
    /// Unix timestamp (ms) of computation.
    pub computed_at: u64,
}
