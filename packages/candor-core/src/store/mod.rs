//! Persistence contract consumed by the engine.
//!
//! The engine persists samples and final scores and reads job roles through
//! this trait; the concrete backend is an external collaborator. The bundled
//! [`MemoryStore`] keeps everything in process for the standalone server and
//! for tests.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::analysis::Sample;
use crate::scoring::{FinalScore, JobRole};

/// Errors surfaced by a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend failure (connection, serialization, quota).
    #[error("store backend: {0}")]
    Backend(String),

    /// Write conflicted with existing state.
    #[error("store conflict: {0}")]
    Conflict(String),
}

/// Convenient Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations the engine depends on.
///
/// Implementations guarantee their own concurrency safety; the engine calls
/// them concurrently from many session tasks.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persists one emitted sample. Must be durable before returning Ok.
    async fn persist_sample(&self, sample: &Sample) -> StoreResult<()>;

    /// All samples for a session, ordered by timestamp ascending.
    async fn list_samples(&self, session_id: &str) -> StoreResult<Vec<Sample>>;

    /// Persists the final score for a session, overwriting any prior value.
    async fn persist_final_score(&self, session_id: &str, score: &FinalScore) -> StoreResult<()>;

    /// The persisted final score for a session, if any.
    async fn get_final_score(&self, session_id: &str) -> StoreResult<Option<FinalScore>>;

    /// Looks up a job role by id.
    async fn get_job_role(&self, job_role_id: &str) -> StoreResult<Option<JobRole>>;

    /// Persists a job role.
    async fn create_job_role(&self, role: &JobRole) -> StoreResult<()>;
}
