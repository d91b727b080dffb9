//! Scripted capture and recognition doubles
//!
//! Both doubles record every acquisition and release in a shared `Probe`, so
//! tests can check that each acquired resource is released exactly once.

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::audio::{AudioCapture, AudioFrame, FrameSink};
use crate::recognition::{
    AuthorizationStatus, RecognitionEvent, RecognitionHandle, RecognitionTask, Recognizer,
};
use crate::transcript::TranscriptionResult;

/// Counters shared between doubles and the test
#[derive(Debug, Default)]
pub struct Probe {
    capture_configured: AtomicUsize,
    capture_started: AtomicUsize,
    capture_stopped: AtomicUsize,
    recognition_begun: AtomicUsize,
    recognition_cancelled: AtomicUsize,
    audio_ended: AtomicUsize,
    appended: Mutex<Vec<u64>>,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn capture_configured(&self) -> usize {
        self.capture_configured.load(Ordering::SeqCst)
    }

    pub fn capture_started(&self) -> usize {
        self.capture_started.load(Ordering::SeqCst)
    }

    pub fn capture_stopped(&self) -> usize {
        self.capture_stopped.load(Ordering::SeqCst)
    }

    pub fn recognition_begun(&self) -> usize {
        self.recognition_begun.load(Ordering::SeqCst)
    }

    pub fn recognition_cancelled(&self) -> usize {
        self.recognition_cancelled.load(Ordering::SeqCst)
    }

    pub fn audio_ended(&self) -> usize {
        self.audio_ended.load(Ordering::SeqCst)
    }

    /// Timestamps of frames appended to recognition, in append order
    pub fn appended_timestamps(&self) -> Vec<u64> {
        self.appended
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Nothing acquired is still held
    pub fn all_released(&self) -> bool {
        self.capture_configured() == self.capture_stopped()
            && self.recognition_begun() == self.recognition_cancelled()
    }
}

/// Capture double with scripted failures and frames
pub struct ScriptedCapture {
    probe: Arc<Probe>,
    configure_error: Option<String>,
    start_error: Option<String>,
    frames: Vec<AudioFrame>,
    end_after_frames: bool,
    sink: Option<FrameSink>,
    capturing: bool,
}

impl ScriptedCapture {
    /// Capture that succeeds and keeps running without producing frames
    pub fn new(probe: Arc<Probe>) -> Self {
        Self {
            probe,
            configure_error: None,
            start_error: None,
            frames: Vec::new(),
            end_after_frames: false,
            sink: None,
            capturing: false,
        }
    }

    pub fn failing_configure(mut self, message: impl Into<String>) -> Self {
        self.configure_error = Some(message.into());
        self
    }

    pub fn failing_start(mut self, message: impl Into<String>) -> Self {
        self.start_error = Some(message.into());
        self
    }

    /// Push `frames` as soon as capture starts
    pub fn with_frames(mut self, frames: Vec<AudioFrame>) -> Self {
        self.frames = frames;
        self
    }

    /// Stop delivering audio (drop the sink) after the scripted frames
    pub fn end_after_frames(mut self) -> Self {
        self.end_after_frames = true;
        self
    }
}

#[async_trait::async_trait]
impl AudioCapture for ScriptedCapture {
    async fn configure_for_voice_capture(&mut self) -> Result<()> {
        if let Some(message) = &self.configure_error {
            bail!("{}", message);
        }
        self.probe.capture_configured.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn start(&mut self, sink: FrameSink) -> Result<()> {
        if let Some(message) = &self.start_error {
            bail!("{}", message);
        }
        self.probe.capture_started.fetch_add(1, Ordering::SeqCst);

        for frame in self.frames.iter().cloned() {
            sink.push(frame);
        }
        if !self.end_after_frames {
            self.sink = Some(sink);
        }
        self.capturing = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.sink = None;
        self.capturing = false;
        self.probe.capture_stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted capture"
    }
}

/// Event a `ScriptedRecognizer` emits
#[derive(Debug, Clone)]
pub enum ScriptedEvent {
    Partial(String),
    Final(String),
    Failure(String),
    /// Partial event carrying a result exactly as given
    PartialResult(TranscriptionResult),
    /// Final event carrying a result exactly as given
    FinalResult(TranscriptionResult),
}

impl ScriptedEvent {
    fn into_event(self) -> RecognitionEvent {
        match self {
            ScriptedEvent::Partial(text) => {
                RecognitionEvent::Partial(TranscriptionResult::partial(text))
            }
            ScriptedEvent::Final(text) => {
                RecognitionEvent::Final(TranscriptionResult::final_result(text))
            }
            ScriptedEvent::Failure(message) => RecognitionEvent::Failure(anyhow::anyhow!(message)),
            ScriptedEvent::PartialResult(result) => RecognitionEvent::Partial(result),
            ScriptedEvent::FinalResult(result) => RecognitionEvent::Final(result),
        }
    }
}

/// Recognition double emitting a fixed script of events
pub struct ScriptedRecognizer {
    probe: Arc<Probe>,
    authorization: std::result::Result<AuthorizationStatus, String>,
    unavailable: Option<String>,
    script: Vec<ScriptedEvent>,
    hold_open: bool,
    final_on_end_audio: Option<String>,
}

impl ScriptedRecognizer {
    /// Authorized recognizer that emits `script` and then finishes
    pub fn new(probe: Arc<Probe>, script: Vec<ScriptedEvent>) -> Self {
        Self {
            probe,
            authorization: Ok(AuthorizationStatus::Authorized),
            unavailable: None,
            script,
            hold_open: false,
            final_on_end_audio: None,
        }
    }

    pub fn with_authorization(mut self, status: AuthorizationStatus) -> Self {
        self.authorization = Ok(status);
        self
    }

    /// Authorization request itself fails
    pub fn failing_authorization(mut self, message: impl Into<String>) -> Self {
        self.authorization = Err(message.into());
        self
    }

    pub fn unavailable(mut self, message: impl Into<String>) -> Self {
        self.unavailable = Some(message.into());
        self
    }

    /// Keep the recognition running after the script until cancelled
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Emit a final result with `text` once audio ends (implies `hold_open`)
    pub fn final_on_end_audio(mut self, text: impl Into<String>) -> Self {
        self.hold_open = true;
        self.final_on_end_audio = Some(text.into());
        self
    }
}

#[async_trait::async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn request_authorization(&self) -> Result<AuthorizationStatus> {
        match &self.authorization {
            Ok(status) => Ok(*status),
            Err(message) => bail!("{}", message),
        }
    }

    async fn begin_recognition(&self) -> Result<RecognitionHandle> {
        if let Some(message) = &self.unavailable {
            bail!("{}", message);
        }
        self.probe.recognition_begun.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(self.script.len() + 1);
        for event in self.script.iter().cloned() {
            // Capacity covers the whole script
            let _ = tx.try_send(event.into_event());
        }

        let task = ScriptedTask {
            probe: Arc::clone(&self.probe),
            events: self.hold_open.then_some(tx),
            final_on_end_audio: self.final_on_end_audio.clone(),
        };

        Ok(RecognitionHandle::new(Box::new(task), rx))
    }

    fn name(&self) -> &str {
        "scripted recognizer"
    }
}

struct ScriptedTask {
    probe: Arc<Probe>,
    events: Option<mpsc::Sender<RecognitionEvent>>,
    final_on_end_audio: Option<String>,
}

impl RecognitionTask for ScriptedTask {
    fn append(&mut self, frame: AudioFrame) {
        self.probe
            .appended
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(frame.timestamp_ms);
    }

    fn end_audio(&mut self) {
        self.probe.audio_ended.fetch_add(1, Ordering::SeqCst);
        if let (Some(text), Some(tx)) = (self.final_on_end_audio.take(), self.events.take()) {
            let _ = tx.try_send(RecognitionEvent::Final(TranscriptionResult::final_result(text)));
        }
    }

    fn cancel(&mut self) {
        self.events = None;
        self.probe.recognition_cancelled.fetch_add(1, Ordering::SeqCst);
    }
}

/// Silent mono 16kHz frame stamped at `timestamp_ms`
pub fn silent_frame(timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples: vec![0; 1600],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}
