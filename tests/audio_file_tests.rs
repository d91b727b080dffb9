// Integration tests for WAV-backed capture
//
// These tests write small WAV fixtures to a temp dir and verify that the
// file capture reads them and replays their samples as frames.

use anyhow::Result;
use futures::StreamExt;
use loqa_transcribe::audio::{AudioCapture, AudioFile, CaptureConfig, FileCapture, FrameSink};
use loqa_transcribe::{SessionConfig, SessionEngine, TranscriptRecognizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

fn write_wav(
    dir: &Path,
    name: &str,
    sample_rate: u32,
    channels: u16,
    samples: &[i16],
) -> Result<PathBuf> {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(path)
}

fn ramp(len: usize) -> Vec<i16> {
    (0..len).map(|i| (i % 1000) as i16).collect()
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write_wav(temp_dir.path(), "speech.wav", 16000, 1, &ramp(8000))?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 8000);
    assert!((audio.duration_seconds - 0.5).abs() < 0.001, "Duration should be 500ms");
    assert!(audio.path.contains("speech.wav"));

    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let path = PathBuf::from("/nonexistent/path/to/audio.wav");
    let result = AudioFile::open(&path);

    assert!(result.is_err(), "Opening nonexistent file should fail");
}

#[test]
fn test_audio_file_frames_split_by_buffer_duration() -> Result<()> {
    let temp_dir = TempDir::new()?;
    // 250ms at 16kHz mono -> two full 100ms frames and one 50ms remainder
    let path = write_wav(temp_dir.path(), "speech.wav", 16000, 1, &ramp(4000))?;

    let audio = AudioFile::open(&path)?;
    let frames = audio.frames(100);

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].samples.len(), 1600);
    assert_eq!(frames[2].samples.len(), 800);
    assert_eq!(
        frames.iter().map(|f| f.timestamp_ms).collect::<Vec<_>>(),
        vec![0, 100, 200]
    );
    assert_eq!(frames[1].duration_ms(), 100);

    Ok(())
}

#[tokio::test]
async fn test_file_capture_replays_all_samples_in_order() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let samples = ramp(4800);
    let path = write_wav(temp_dir.path(), "speech.wav", 16000, 1, &samples)?;

    let mut capture = FileCapture::new(&path, CaptureConfig::default());
    capture.configure_for_voice_capture().await?;

    let (sink, mut rx) = FrameSink::channel(16);
    capture.start(sink).await?;

    let mut replayed = Vec::new();
    let mut timestamps = Vec::new();
    while let Some(frame) = rx.recv().await {
        timestamps.push(frame.timestamp_ms);
        replayed.extend(frame.samples);
    }

    assert_eq!(replayed, samples, "Capture should deliver the file's samples");
    assert_eq!(timestamps, vec![0, 100, 200]);

    capture.stop().await?;
    assert!(!capture.is_capturing());

    Ok(())
}

#[tokio::test]
async fn test_file_capture_rejects_format_mismatch() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write_wav(temp_dir.path(), "stereo.wav", 48000, 2, &ramp(9600))?;

    let mut capture = FileCapture::new(&path, CaptureConfig::default());
    let err = capture
        .configure_for_voice_capture()
        .await
        .expect_err("48kHz stereo should not configure for 16kHz mono");

    assert!(err.to_string().contains("format mismatch"));

    Ok(())
}

#[tokio::test]
async fn test_file_capture_start_requires_configure() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write_wav(temp_dir.path(), "speech.wav", 16000, 1, &ramp(1600))?;

    let mut capture = FileCapture::new(&path, CaptureConfig::default());
    let (sink, _rx) = FrameSink::channel(4);

    assert!(capture.start(sink).await.is_err());
    assert!(!capture.is_capturing());

    Ok(())
}

#[tokio::test]
async fn test_file_replay_reports_known_transcript() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write_wav(temp_dir.path(), "speech.wav", 16000, 1, &ramp(4000))?;

    let engine = SessionEngine::new(
        Box::new(FileCapture::new(&path, CaptureConfig::default())),
        Arc::new(TranscriptRecognizer::new("hello world")),
        SessionConfig::default(),
    );

    let items: Vec<_> = timeout(
        Duration::from_secs(5),
        engine.start_session().await.collect(),
    )
    .await?;

    assert_eq!(items.len(), 1, "One final result once the file is consumed");
    let result = items[0].clone()?;
    assert!(result.is_final);
    assert_eq!(result.formatted_text(), "hello world");
    assert_eq!(result.best_transcription.duration(), Duration::from_millis(250));

    let stats = engine.last_session_stats().await.expect("stats recorded");
    assert_eq!(stats.frames_forwarded, 3);

    Ok(())
}
