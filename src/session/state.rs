use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Why a session reached its terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Backend delivered its final result or finished on its own
    Completed,
    /// `finish_session` was called or the consumer dropped the stream
    Cancelled,
    CaptureConfigFailed,
    CaptureStartFailed,
    RecognitionUnavailable,
    RecognitionFailed,
}

impl From<&SessionError> for TerminationReason {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::CaptureConfig(_) => TerminationReason::CaptureConfigFailed,
            SessionError::CaptureStart(_) => TerminationReason::CaptureStartFailed,
            SessionError::RecognitionUnavailable(_) => TerminationReason::RecognitionUnavailable,
            SessionError::RecognitionFailed(_) => TerminationReason::RecognitionFailed,
        }
    }
}

/// Lifecycle of a single session, owned by its session task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    Idle,
    Starting,
    Streaming,
    Finishing,
    Terminated(TerminationReason),
}

impl SessionState {
    pub(crate) fn is_active(self) -> bool {
        matches!(
            self,
            SessionState::Starting | SessionState::Streaming | SessionState::Finishing
        )
    }
}
