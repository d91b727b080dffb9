use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::TerminationReason;

/// Statistics about a transcription session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Generated session identifier
    pub session_id: String,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// When the session reached a terminal state
    pub ended_at: Option<DateTime<Utc>>,

    /// Number of captured frames handed to the recognizer
    pub frames_forwarded: usize,

    /// Number of results published on the session stream
    pub results_published: usize,

    /// How the session ended (None while still running)
    pub termination: Option<TerminationReason>,
}

impl SessionStats {
    pub(crate) fn new(session_id: String) -> Self {
        Self {
            session_id,
            started_at: Utc::now(),
            ended_at: None,
            frames_forwarded: 0,
            results_published: 0,
            termination: None,
        }
    }

    pub(crate) fn finish(&mut self, reason: TerminationReason) {
        self.ended_at = Some(Utc::now());
        self.termination = Some(reason);
    }

    /// Total duration in seconds (up to now while the session is running)
    pub fn duration_secs(&self) -> f64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        end.signed_duration_since(self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
