pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod recognition;
pub mod recorder;
pub mod session;
pub mod testing;
pub mod transcript;

pub use audio::{AudioCapture, AudioFile, AudioFrame, CaptureConfig, FileCapture, FrameSink};
pub use client::{PreviewClient, PreviewScript, TranscriptionClient};
pub use config::Config;
pub use error::SessionError;
pub use recognition::{
    AuthorizationStatus, RecognitionEvent, RecognitionHandle, RecognitionTask, Recognizer,
    TranscriptRecognizer,
};
pub use recorder::{Recorder, RecorderAlert, RecorderState};
pub use session::{
    SessionConfig, SessionEngine, SessionItem, SessionStats, SessionStream, TerminationReason,
};
pub use transcript::{
    AcousticFeature, Segment, SessionMetadata, Transcription, TranscriptionResult, VoiceAnalytics,
};
