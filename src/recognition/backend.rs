use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

use crate::audio::AudioFrame;
use crate::transcript::TranscriptionResult;

/// Speech recognition permission state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Authorized,
    Denied,
    Restricted,
    NotDetermined,
}

impl AuthorizationStatus {
    pub fn is_authorized(self) -> bool {
        self == AuthorizationStatus::Authorized
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthorizationStatus::Authorized => "authorized",
            AuthorizationStatus::Denied => "denied",
            AuthorizationStatus::Restricted => "restricted",
            AuthorizationStatus::NotDetermined => "not_determined",
        };
        f.write_str(s)
    }
}

/// Event emitted by a running recognition task
///
/// A backend either reports a result or an error; there is no third state.
#[derive(Debug)]
pub enum RecognitionEvent {
    /// Interim reading, may still change
    Partial(TranscriptionResult),
    /// Terminal reading; the backend emits nothing after it
    Final(TranscriptionResult),
    /// Backend error; the backend emits nothing after it
    Failure(anyhow::Error),
}

/// A running recognition request that accepts audio
pub trait RecognitionTask: Send {
    /// Append captured audio, in capture order
    fn append(&mut self, frame: AudioFrame);

    /// Signal that no more audio will arrive
    fn end_audio(&mut self);

    /// Cancel recognition and release the backend
    fn cancel(&mut self);
}

/// Handle to a recognition task and the events it emits
///
/// The backend closes the event channel once it is done with the request.
pub struct RecognitionHandle {
    pub task: Box<dyn RecognitionTask>,
    pub events: mpsc::Receiver<RecognitionEvent>,
}

impl RecognitionHandle {
    pub fn new(task: Box<dyn RecognitionTask>, events: mpsc::Receiver<RecognitionEvent>) -> Self {
        Self { task, events }
    }
}

/// Speech recognition backend capability
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    /// Ask the backend (or platform) for permission to recognize speech
    async fn request_authorization(&self) -> Result<AuthorizationStatus>;

    /// Begin a new recognition request
    async fn begin_recognition(&self) -> Result<RecognitionHandle>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
