use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use super::metadata::SessionMetadata;

/// A single transcription result delivered on a session stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Highest-confidence reading of the audio so far
    pub best_transcription: Transcription,

    /// Ranked alternative readings (index 0 = next best)
    pub alternative_transcriptions: Vec<Transcription>,

    /// Whether this is the terminal, authoritative result of the session
    pub is_final: bool,

    /// Voice-quality metadata, only present on final results from backends that support it
    pub metadata: Option<SessionMetadata>,
}

impl TranscriptionResult {
    /// Interim result carrying only formatted text
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            best_transcription: Transcription::from_text(text),
            alternative_transcriptions: Vec::new(),
            is_final: false,
            metadata: None,
        }
    }

    /// Terminal result carrying only formatted text
    pub fn final_result(text: impl Into<String>) -> Self {
        Self {
            is_final: true,
            ..Self::partial(text)
        }
    }

    pub fn with_alternatives(mut self, alternatives: Vec<Transcription>) -> Self {
        self.alternative_transcriptions = alternatives;
        self
    }

    pub fn with_metadata(mut self, metadata: SessionMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Formatted text of the best transcription
    pub fn formatted_text(&self) -> &str {
        &self.best_transcription.formatted_text
    }
}

/// One reading of the captured audio
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    /// Display-ready text
    pub formatted_text: String,

    /// Timed pieces of the text, in time order
    pub segments: Vec<Segment>,
}

impl Transcription {
    pub fn new(formatted_text: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            formatted_text: formatted_text.into(),
            segments,
        }
    }

    pub fn from_text(formatted_text: impl Into<String>) -> Self {
        Self::new(formatted_text, Vec::new())
    }

    /// Total span covered by the segments (zero when there are none)
    pub fn duration(&self) -> Duration {
        self.segments
            .iter()
            .map(Segment::end_offset)
            .max()
            .unwrap_or_default()
    }
}

/// A timed piece of a transcription (usually one word)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,

    /// Other plausible readings of the same audio span
    pub alternatives: BTreeSet<String>,

    /// Confidence score (0.0 to 1.0)
    pub confidence: f32,

    /// Offset from the start of the session audio
    pub start_offset: Duration,

    pub duration: Duration,
}

impl Segment {
    /// Create a segment; confidence is clamped into [0, 1]
    pub fn new(
        text: impl Into<String>,
        confidence: f32,
        start_offset: Duration,
        duration: Duration,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Self {
            text: text.into(),
            alternatives: BTreeSet::new(),
            confidence,
            start_offset,
            duration,
        }
    }

    pub fn with_alternatives<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternatives = alternatives.into_iter().map(Into::into).collect();
        self
    }

    /// End of the segment, saturating at `Duration::MAX`
    pub fn end_offset(&self) -> Duration {
        self.start_offset.saturating_add(self.duration)
    }
}
