//! Session summary: averages, trends, and coaching recommendations.

use serde::{Deserialize, Serialize};

use crate::analysis::Sample;

/// Direction of a score over the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

/// Aggregated view of a session's overall scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_analysis_points: usize,
    pub average_confidence: f64,
    pub average_stress: f64,
    pub confidence_trend: Trend,
    pub stress_trend: Trend,
    pub session_duration_minutes: f64,
    pub recommendations: Vec<String>,
}

/// Folds a session's samples into a [`SessionSummary`].
///
/// Averages come from the continuous overall scores; trends compare the
/// first half of the session against the second with a ±0.1 threshold.
pub fn summarize(samples: &[Sample]) -> SessionSummary {
    let confidence: Vec<f64> = samples
        .iter()
        .map(|s| s.overall.confidence_score as f64)
        .collect();
    let stress: Vec<f64> = samples
        .iter()
        .map(|s| s.overall.stress_score as f64)
        .collect();

    let average = |values: &[f64]| {
        if values.is_empty() {
            0.5
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };

    let duration_minutes = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) if samples.len() >= 2 => {
            (last.timestamp.saturating_sub(first.timestamp)) as f64 / 60_000.0
        }
        _ => 0.0,
    };

    let mut summary = SessionSummary {
        total_analysis_points: samples.len(),
        average_confidence: average(&confidence),
        average_stress: average(&stress),
        confidence_trend: trend(&confidence),
        stress_trend: trend(&stress),
        session_duration_minutes: (duration_minutes * 100.0).round() / 100.0,
        recommendations: Vec::new(),
    };
    summary.recommendations = recommendations(&summary);
    summary
}

fn trend(scores: &[f64]) -> Trend {
    if scores.len() < 2 {
        return Trend::InsufficientData;
    }
    let mid = scores.len() / 2;
    let first_half = scores[..mid].iter().sum::<f64>() / mid as f64;
    let second_half = scores[mid..].iter().sum::<f64>() / (scores.len() - mid) as f64;
    let diff = second_half - first_half;
    if diff > 0.1 {
        Trend::Improving
    } else if diff < -0.1 {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

fn recommendations(summary: &SessionSummary) -> Vec<String> {
    let mut out = Vec::new();
    if summary.average_confidence < 0.4 {
        out.push(
            "Consider practicing confident body language and maintaining eye contact".to_string(),
        );
    }
    if summary.average_stress > 0.6 {
        out.push(
            "Try relaxation techniques before interviews to manage stress levels".to_string(),
        );
    }
    if summary.confidence_trend == Trend::Declining {
        out.push("Focus on maintaining confidence throughout the interview".to_string());
    }
    if summary.stress_trend == Trend::Improving {
        out.push("Good progress on stress management during the session".to_string());
    }
    if out.is_empty() {
        out.push(
            "Overall performance looks good - keep up the positive interview presence".to_string(),
        );
    }
    out
}
