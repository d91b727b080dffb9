use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::backend::{
    AuthorizationStatus, RecognitionEvent, RecognitionHandle, RecognitionTask, Recognizer,
};
use crate::audio::AudioFrame;
use crate::transcript::{Segment, Transcription, TranscriptionResult};

/// Recognizer that reports a known transcript once the audio ends
///
/// Used to replay recordings whose text is already known. The final result
/// carries one segment spanning all audio the session forwarded.
pub struct TranscriptRecognizer {
    transcript: String,
}

impl TranscriptRecognizer {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
        }
    }
}

#[async_trait::async_trait]
impl Recognizer for TranscriptRecognizer {
    async fn request_authorization(&self) -> Result<AuthorizationStatus> {
        Ok(AuthorizationStatus::Authorized)
    }

    async fn begin_recognition(&self) -> Result<RecognitionHandle> {
        let (tx, rx) = mpsc::channel(1);
        let task = TranscriptTask {
            transcript: self.transcript.clone(),
            heard_ms: 0,
            events: Some(tx),
        };
        Ok(RecognitionHandle::new(Box::new(task), rx))
    }

    fn name(&self) -> &str {
        "transcript recognizer"
    }
}

struct TranscriptTask {
    transcript: String,
    heard_ms: u64,
    events: Option<mpsc::Sender<RecognitionEvent>>,
}

impl RecognitionTask for TranscriptTask {
    fn append(&mut self, frame: AudioFrame) {
        self.heard_ms = self.heard_ms.saturating_add(frame.duration_ms());
    }

    fn end_audio(&mut self) {
        let Some(tx) = self.events.take() else {
            return;
        };

        let heard = Duration::from_millis(self.heard_ms);
        debug!("Audio ended after {:?}, reporting transcript", heard);

        let segment = Segment::new(self.transcript.clone(), 1.0, Duration::ZERO, heard);
        let result = TranscriptionResult {
            best_transcription: Transcription::new(self.transcript.clone(), vec![segment]),
            alternative_transcriptions: Vec::new(),
            is_final: true,
            metadata: None,
        };
        // Only event ever sent on a capacity-1 channel
        let _ = tx.try_send(RecognitionEvent::Final(result));
    }

    fn cancel(&mut self) {
        self.events = None;
    }
}
