//! Session lifecycle types and the process-wide registry.

mod manager;

pub use manager::SessionManager;

use serde::{Deserialize, Serialize};

use crate::analysis::Sample;

/// Immutable identity of a session, threaded through the scheduler and
/// stamped onto every emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub user_id: String,
    pub job_role_id: Option<String>,
}

/// Lifecycle state of a session.
///
/// ```text
/// Starting ──start──▶ Running ──stop──▶ Stopping ──(flush done | deadline)──▶ Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Read-only view of a live session for query endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub user_id: String,
    pub job_role_id: Option<String>,
    pub state: SessionState,
    /// Unix timestamp (ms) when the session started.
    pub started_at: u64,
    /// The most recently emitted sample, if any.
    pub last_sample: Option<Sample>,
}
