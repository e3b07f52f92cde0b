use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transport::SessionState;

/// Snapshot of a session's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Transport connection state
    pub state: SessionState,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Elapsed seconds since creation
    pub duration_secs: f64,

    /// Turns recorded so far
    pub turn_count: usize,

    /// Actions awaiting a user response
    pub pending_action_count: usize,

    /// Dispatch outcomes recorded so far
    pub executed_action_count: usize,

    /// Persisted conversation id, once finalized
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub conversation_id: Option<Uuid>,
}
