// File-backed voice capture
//
// Replays a 16-bit PCM WAV file through the capture interface, frame by frame,
// optionally paced at real time. Used for demos, batch runs and tests.

use anyhow::{bail, Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioCapture, AudioFrame, CaptureConfig, FrameSink};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            bail!(
                "Unsupported WAV encoding: expected 16-bit PCM, got {}-bit {:?}",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Split the file into frames of `buffer_duration_ms` each
    pub fn frames(&self, buffer_duration_ms: u64) -> Vec<AudioFrame> {
        let per_frame = (self.sample_rate as u64 * buffer_duration_ms / 1000) as usize
            * self.channels as usize;
        if per_frame == 0 {
            return Vec::new();
        }

        self.samples
            .chunks(per_frame)
            .enumerate()
            .map(|(i, chunk)| AudioFrame {
                samples: chunk.to_vec(),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: i as u64 * buffer_duration_ms,
            })
            .collect()
    }
}

/// Capture that replays a WAV file
pub struct FileCapture {
    path: PathBuf,
    config: CaptureConfig,
    realtime: bool,
    audio: Option<AudioFile>,
    task: Option<JoinHandle<()>>,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>, config: CaptureConfig) -> Self {
        Self {
            path: path.into(),
            config,
            realtime: false,
            audio: None,
            task: None,
        }
    }

    /// Pace frames at the rate they would arrive from a live device
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
}

#[async_trait::async_trait]
impl AudioCapture for FileCapture {
    async fn configure_for_voice_capture(&mut self) -> Result<()> {
        let audio = AudioFile::open(&self.path)
            .with_context(|| format!("Failed to load capture file {}", self.path.display()))?;

        if audio.sample_rate != self.config.target_sample_rate
            || audio.channels != self.config.target_channels
        {
            bail!(
                "Capture file format mismatch. Expected {}Hz {}ch, got {}Hz {}ch",
                self.config.target_sample_rate,
                self.config.target_channels,
                audio.sample_rate,
                audio.channels
            );
        }

        self.audio = Some(audio);
        Ok(())
    }

    async fn start(&mut self, sink: FrameSink) -> Result<()> {
        if self.task.is_some() {
            bail!("Already capturing");
        }
        let Some(audio) = &self.audio else {
            bail!("Capture file was not configured");
        };

        let frames = audio.frames(self.config.buffer_duration_ms);
        let pace = self
            .realtime
            .then(|| Duration::from_millis(self.config.buffer_duration_ms));

        info!(
            "Starting file capture: {} ({} frames)",
            audio.path,
            frames.len()
        );

        self.task = Some(tokio::spawn(async move {
            for frame in frames {
                if let Some(pace) = pace {
                    tokio::time::sleep(pace).await;
                }
                if !sink.send(frame).await {
                    debug!("Frame sink detached, ending file capture");
                    return;
                }
            }
            debug!("File capture reached end of file");
        }));

        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("File capture stopped");
        }
        self.audio = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn name(&self) -> &str {
        "WAV file"
    }
}
