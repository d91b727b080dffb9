//! Transcription result model
//!
//! Plain value types produced for every recognition event:
//! - `TranscriptionResult`: one streamed item (partial or final)
//! - `Transcription` / `Segment`: a reading of the audio and its timed pieces
//! - `SessionMetadata` / `VoiceAnalytics`: optional voice-quality data on final results

mod metadata;
mod result;

pub use metadata::{AcousticFeature, SessionMetadata, VoiceAnalytics};
pub use result::{Segment, Transcription, TranscriptionResult};
