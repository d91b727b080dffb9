//! Speech recognition capability
//!
//! The session engine never recognizes speech itself. It drives a `Recognizer`,
//! which hands out a `RecognitionHandle` per session: audio goes in through the
//! task, `RecognitionEvent`s come back on the event channel.
//!
//! `TranscriptRecognizer` reports a known transcript when the audio ends, for
//! replaying recordings without a speech model.

mod backend;
mod transcript;

pub use backend::{
    AuthorizationStatus, RecognitionEvent, RecognitionHandle, RecognitionTask, Recognizer,
};
pub use transcript::TranscriptRecognizer;
