use serde::{Deserialize, Serialize};

/// Configuration for transcription sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prefix for generated session identifiers (e.g., "transcribe-<uuid>")
    pub id_prefix: String,

    /// Captured frames buffered ahead of the recognizer before new frames are dropped
    /// Default: 256 (~25 seconds of 100ms buffers)
    pub frame_queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            id_prefix: "transcribe".to_string(),
            frame_queue_capacity: 256,
        }
    }
}

impl SessionConfig {
    pub(crate) fn next_session_id(&self) -> String {
        format!("{}-{}", self.id_prefix, uuid::Uuid::new_v4())
    }
}
