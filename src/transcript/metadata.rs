use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Speaking metadata attached to a final result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Average pause between words
    pub average_pause_duration: Duration,

    /// Words per minute (never negative)
    pub speaking_rate: f64,

    /// Per-frame acoustic analysis, if the backend produced one
    pub voice_analytics: Option<VoiceAnalytics>,
}

impl SessionMetadata {
    pub fn new(average_pause_duration: Duration, speaking_rate: f64) -> Self {
        Self {
            average_pause_duration,
            speaking_rate: if speaking_rate.is_finite() {
                speaking_rate.max(0.0)
            } else {
                0.0
            },
            voice_analytics: None,
        }
    }

    pub fn with_voice_analytics(mut self, analytics: VoiceAnalytics) -> Self {
        self.voice_analytics = Some(analytics);
        self
    }
}

/// Voice-quality feature series computed over the session audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceAnalytics {
    pub jitter: AcousticFeature,
    pub pitch: AcousticFeature,
    pub shimmer: AcousticFeature,
    pub voicing: AcousticFeature,
}

/// One acoustic feature sampled once per analysis frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcousticFeature {
    /// One value per analyzed frame, in frame order
    pub values_per_frame: Vec<f64>,

    /// Duration of a single analysis frame
    pub frame_duration: Duration,
}

impl AcousticFeature {
    pub fn new(values_per_frame: Vec<f64>, frame_duration: Duration) -> Self {
        Self {
            values_per_frame,
            frame_duration,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.values_per_frame.len()
    }

    /// Span of audio the series covers, saturating at `Duration::MAX`
    pub fn total_duration(&self) -> Duration {
        u32::try_from(self.values_per_frame.len())
            .ok()
            .and_then(|frames| self.frame_duration.checked_mul(frames))
            .unwrap_or(Duration::MAX)
    }
}
