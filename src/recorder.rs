// Headless recorder state machine for presentation layers
//
// NotRecording -> Recording -> NotRecording, driven by a TranscriptionClient.
// User-facing alert messages live here; the session engine only reports
// typed errors.

use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::client::TranscriptionClient;

/// Alert a presentation layer should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderAlert {
    AuthorizationDenied,
    TranscriptionFailed,
}

impl fmt::Display for RecorderAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderAlert::AuthorizationDenied => {
                f.write_str("You denied access to speech recognition or it is not available")
            }
            RecorderAlert::TranscriptionFailed => {
                f.write_str("An error occurred while transcribing")
            }
        }
    }
}

/// What the presentation layer renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecorderState {
    pub is_recording: bool,
    pub transcribed_text: String,
    pub alert: Option<RecorderAlert>,
}

pub struct Recorder {
    client: Arc<dyn TranscriptionClient>,
    state: watch::Sender<RecorderState>,
}

impl Recorder {
    pub fn new(client: Arc<dyn TranscriptionClient>) -> Self {
        let (state, _) = watch::channel(RecorderState::default());
        Self { client, state }
    }

    pub fn snapshot(&self) -> RecorderState {
        self.state.borrow().clone()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<RecorderState> {
        self.state.subscribe()
    }

    pub fn dismiss_alert(&self) {
        self.state.send_modify(|s| s.alert = None);
    }

    /// Stop if recording, start otherwise
    pub async fn toggle(&self) {
        if self.state.borrow().is_recording {
            self.stop().await;
        } else {
            self.start().await;
        }
    }

    /// Request authorization, then record until the session stream ends
    pub async fn start(&self) {
        if self.state.borrow().is_recording {
            return;
        }

        let status = self.client.request_authorization().await;
        if !status.is_authorized() {
            info!("Not recording, authorization is {}", status);
            self.state
                .send_modify(|s| s.alert = Some(RecorderAlert::AuthorizationDenied));
            return;
        }

        self.state.send_modify(|s| {
            s.is_recording = true;
            s.alert = None;
        });

        let mut stream = self.client.start_session().await;
        while let Some(item) = stream.next().await {
            match item {
                Ok(result) => {
                    let text = result.formatted_text().to_string();
                    self.state.send_modify(|s| s.transcribed_text = text);
                }
                Err(e) => {
                    warn!("Transcription stream failed: {}", e);
                    self.state.send_modify(|s| {
                        s.is_recording = false;
                        s.alert = Some(RecorderAlert::TranscriptionFailed);
                    });
                    return;
                }
            }
        }

        self.state.send_modify(|s| s.is_recording = false);
    }

    /// Finish the session without raising an alert
    pub async fn stop(&self) {
        self.client.finish_session().await;
        self.state.send_modify(|s| s.is_recording = false);
    }
}
