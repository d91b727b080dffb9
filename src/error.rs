use thiserror::Error;

/// Terminal errors of a transcription session
///
/// Each variant carries the message reported by the failing capability.
/// Cancelling a session is never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Could not configure audio capture: {0}")]
    CaptureConfig(String),

    #[error("Could not start audio capture: {0}")]
    CaptureStart(String),

    #[error("Speech recognition unavailable: {0}")]
    RecognitionUnavailable(String),

    #[error("Speech recognition failed: {0}")]
    RecognitionFailed(String),
}

impl SessionError {
    pub(crate) fn capture_config(err: &anyhow::Error) -> Self {
        Self::CaptureConfig(format!("{err:#}"))
    }

    pub(crate) fn capture_start(err: &anyhow::Error) -> Self {
        Self::CaptureStart(format!("{err:#}"))
    }

    pub(crate) fn recognition_unavailable(err: &anyhow::Error) -> Self {
        Self::RecognitionUnavailable(format!("{err:#}"))
    }

    pub(crate) fn recognition_failed(err: &anyhow::Error) -> Self {
        Self::RecognitionFailed(format!("{err:#}"))
    }
}
