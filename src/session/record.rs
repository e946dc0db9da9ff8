use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a call
///
/// `Starting → Active → Completed`, with `Failed` reachable from either
/// non-terminal state on provider setup failure or relay abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Starting,
    Active,
    Completed,
    Failed,
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Failed)
    }
}

/// Snapshot of a call session, as returned by the lifecycle API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// Unique call identifier
    pub call_id: String,

    pub status: CallStatus,

    /// When the call was created
    pub created_at: DateTime<Utc>,

    /// When the call reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,

    /// completed_at − created_at, in seconds
    pub duration_secs: Option<f64>,

    /// Frames archived so far
    pub frames_captured: usize,

    /// Total archived PCM bytes
    pub audio_bytes: usize,

    /// Transcription events received from the provider
    pub transcript_events: usize,

    /// Path of the persisted audio artifact, once written
    pub artifact_path: Option<String>,
}
