use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Duration of audio held by this frame, in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }
}

/// Configuration for voice capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Target sample rate (recognizers generally expect 16kHz)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz for speech
            target_channels: 1,        // Mono
            buffer_duration_ms: 100,   // 100ms buffers
        }
    }
}

impl CaptureConfig {
    /// Interleaved samples in one buffer of `buffer_duration_ms`
    pub fn samples_per_buffer(&self) -> usize {
        (self.target_sample_rate as u64 * self.buffer_duration_ms / 1000) as usize
            * self.target_channels as usize
    }
}

/// Destination for captured audio frames
///
/// Handed to `AudioCapture::start`. Pushing never blocks, so it is safe to call
/// from a device callback. Once the session detaches the sink, pushes are dropped.
#[derive(Debug, Clone)]
pub struct FrameSink {
    tx: mpsc::Sender<AudioFrame>,
}

impl FrameSink {
    /// Create a sink and the receiving end the session reads from
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AudioFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Push a frame in capture order. Returns false if the frame was dropped.
    pub fn push(&self, frame: AudioFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                warn!(
                    "Frame queue full, dropping frame at {}ms ({} samples)",
                    frame.timestamp_ms,
                    frame.samples.len()
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Push a frame, waiting for queue space (for producers that are not device callbacks)
    pub async fn send(&self, frame: AudioFrame) -> bool {
        self.tx.send(frame).await.is_ok()
    }

    /// Whether the session has detached this sink
    pub fn is_detached(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Audio capture capability used by the session engine
///
/// Implementations:
/// - `FileCapture`: replays a WAV file as live frames
/// - `testing::ScriptedCapture`: scripted failures and frames for tests
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    /// Acquire and configure the input device for voice capture
    async fn configure_for_voice_capture(&mut self) -> Result<()>;

    /// Start capturing, pushing frames into `sink` in capture order
    async fn start(&mut self, sink: FrameSink) -> Result<()>;

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<()>;

    /// Check if capture is currently running
    fn is_capturing(&self) -> bool;

    /// Get capture name for logging
    fn name(&self) -> &str;
}
