//! In-memory store for the standalone server and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::analysis::Sample;
use crate::scoring::{FinalScore, JobRole};

use super::{Store, StoreResult};

/// DashMap-backed store with per-session sample logs.
///
/// Samples append under a per-session mutex so the timestamp-ascending
/// ordering of `list_samples` follows from the engine's per-session emission
/// order.
pub struct MemoryStore {
    samples: DashMap<String, Mutex<Vec<Sample>>>,
    final_scores: DashMap<String, FinalScore>,
    job_roles: DashMap<String, JobRole>,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            samples: DashMap::new(),
            final_scores: DashMap::new(),
            job_roles: DashMap::new(),
        }
    }

    /// Number of samples recorded for a session.
    pub fn sample_count(&self, session_id: &str) -> usize {
        self.samples
            .get(session_id)
            .map(|log| log.lock().len())
            .unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn persist_sample(&self, sample: &Sample) -> StoreResult<()> {
        self.samples
            .entry(sample.session_id.clone())
            .or_insert_with(|| Mutex::new(Vec::new()))
            .lock()
            .push(sample.clone());
        Ok(())
    }

    async fn list_samples(&self, session_id: &str) -> StoreResult<Vec<Sample>> {
        let mut samples = self
            .samples
            .get(session_id)
            .map(|log| log.lock().clone())
            .unwrap_or_default();
        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }

    async fn persist_final_score(&self, session_id: &str, score: &FinalScore) -> StoreResult<()> {
        self.final_scores
            .insert(session_id.to_string(), score.clone());
        Ok(())
    }

    async fn get_final_score(&self, session_id: &str) -> StoreResult<Option<FinalScore>> {
        Ok(self.final_scores.get(session_id).map(|s| s.clone()))
    }

    async fn get_job_role(&self, job_role_id: &str) -> StoreResult<Option<JobRole>> {
        Ok(self.job_roles.get(job_role_id).map(|r| r.clone()))
    }

    async fn create_job_role(&self, role: &JobRole) -> StoreResult<()> {
        self.job_roles
            .insert(role.job_role_id.clone(), role.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::JobRoleWeights;

    fn sample(session: &str, ts: u64) -> Sample {
        Sample {
            session_id: session.to_string(),
            timestamp: ts,
            ..Sample::default()
        }
    }

    #[tokio::test]
    async fn samples_listed_in_timestamp_order() {
        let store = MemoryStore::new();
        store.persist_sample(&sample("s1", 30)).await.unwrap();
        store.persist_sample(&sample("s1", 10)).await.unwrap();
        store.persist_sample(&sample("s1", 20)).await.unwrap();
        store.persist_sample(&sample("s2", 5)).await.unwrap();

        let samples = store.list_samples("s1").await.unwrap();
        let timestamps: Vec<u64> = samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn unknown_session_lists_empty() {
        let store = MemoryStore::new();
        assert!(store.list_samples("nope").await.unwrap().is_empty());
        assert_eq!(store.sample_count("nope"), 0);
    }

    #[tokio::test]
    async fn final_score_overwrites() {
        let store = MemoryStore::new();
        let mut score = FinalScore {
            session_id: "s1".to_string(),
            user_id: "u1".to_string(),
            job_role_id: None,
            confidence_breakdown: Default::default(),
            overall_confidence: 10.0,
            confidence_band: crate::scoring::ConfidenceBand::VeryLow,
            overall_stress: 0.0,
            stress_band: crate::scoring::StressBand::VeryLow,
            samples_analyzed: 1,
            job_weights: JobRoleWeights::default(),
            computed_at: 0,
        };
        store.persist_final_score("s1", &score).await.unwrap();

        score.overall_confidence = 90.0;
        store.persist_final_score("s1", &score).await.unwrap();

        let stored = store.get_final_score("s1").await.unwrap().unwrap();
        assert_eq!(stored.overall_confidence, 90.0);
    }

    #[tokio::test]
    async fn job_role_round_trip() {
        let store = MemoryStore::new();
        let role = JobRole::create("engineer", JobRoleWeights::default());
        store.create_job_role(&role).await.unwrap();

        let fetched = store.get_job_role(&role.job_role_id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "engineer");
        assert!(store.get_job_role("missing").await.unwrap().is_none());
    }
}
