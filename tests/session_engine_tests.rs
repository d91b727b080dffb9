// Integration tests for the session engine
//
// These tests drive the engine with scripted capture and recognition doubles
// and check the result stream, the termination reason and that every acquired
// resource is released exactly once.

use anyhow::Result;
use futures::StreamExt;
use loqa_transcribe::session::SharedCapture;
use loqa_transcribe::testing::{
    silent_frame, Probe, ScriptedCapture, ScriptedEvent, ScriptedRecognizer,
};
use loqa_transcribe::{
    AudioCapture, AuthorizationStatus, SessionConfig, SessionEngine, SessionError, SessionItem,
    SessionMetadata, SessionStream, TerminationReason, TranscriptionResult,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

const TIMEOUT: Duration = Duration::from_secs(5);

fn engine(capture: ScriptedCapture, recognizer: ScriptedRecognizer) -> SessionEngine {
    SessionEngine::new(Box::new(capture), Arc::new(recognizer), SessionConfig::default())
}

async fn collect(stream: SessionStream) -> Vec<SessionItem> {
    timeout(TIMEOUT, stream.collect::<Vec<_>>())
        .await
        .expect("session stream should terminate")
}

async fn next_item(stream: &mut SessionStream) -> Option<SessionItem> {
    timeout(TIMEOUT, stream.next())
        .await
        .expect("session stream should yield")
}

async fn wait_until_inactive(engine: &SessionEngine) {
    timeout(TIMEOUT, async {
        while engine.is_active().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session should terminate");
}

async fn termination(engine: &SessionEngine) -> Option<TerminationReason> {
    engine.last_session_stats().await.and_then(|s| s.termination)
}

/// Two engines over one capture device, both streaming "Hello" and staying open
fn engines_sharing_capture(probe: &Arc<Probe>) -> (SessionEngine, SessionEngine) {
    let device: Box<dyn AudioCapture> = Box::new(ScriptedCapture::new(probe.clone()));
    let capture: SharedCapture = Arc::new(Mutex::new(device));
    let recognizer = Arc::new(
        ScriptedRecognizer::new(probe.clone(), vec![ScriptedEvent::Partial("Hello".into())])
            .hold_open(),
    );

    let first = SessionEngine::with_shared_capture(
        Arc::clone(&capture),
        recognizer.clone(),
        SessionConfig::default(),
    );
    let second = SessionEngine::with_shared_capture(capture, recognizer, SessionConfig::default());
    (first, second)
}

#[tokio::test]
async fn test_happy_path_streams_partials_then_final() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(
            probe.clone(),
            vec![
                ScriptedEvent::Partial("Lorem".into()),
                ScriptedEvent::Partial("Lorem ipsum".into()),
                ScriptedEvent::Final("Lorem ipsum".into()),
            ],
        ),
    );

    let items = collect(engine.start_session().await).await;

    assert_eq!(
        items,
        vec![
            Ok(TranscriptionResult::partial("Lorem")),
            Ok(TranscriptionResult::partial("Lorem ipsum")),
            Ok(TranscriptionResult::final_result("Lorem ipsum")),
        ]
    );
    assert_eq!(termination(&engine).await, Some(TerminationReason::Completed));
    assert!(!engine.is_active().await);
}

#[tokio::test]
async fn test_single_final_result_is_last() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(
            probe.clone(),
            vec![
                ScriptedEvent::Partial("one".into()),
                ScriptedEvent::Final("one two".into()),
                // Anything after the final result is never published
                ScriptedEvent::Partial("three".into()),
                ScriptedEvent::Final("one two three".into()),
            ],
        )
        .hold_open(),
    );

    let items = collect(engine.start_session().await).await;
    let finals: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| matches!(item, Ok(r) if r.is_final))
        .map(|(i, _)| i)
        .collect();

    assert_eq!(items.len(), 2);
    assert_eq!(finals, vec![1], "Exactly one final result, in last position");
    assert!(probe.all_released());
}

#[tokio::test]
async fn test_resources_released_once_after_completion() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(probe.clone(), vec![ScriptedEvent::Final("done".into())]),
    );

    collect(engine.start_session().await).await;

    assert_eq!(probe.capture_configured(), 1);
    assert_eq!(probe.capture_started(), 1);
    assert_eq!(probe.capture_stopped(), 1);
    assert_eq!(probe.recognition_begun(), 1);
    assert_eq!(probe.recognition_cancelled(), 1);

    let stats = engine.last_session_stats().await.expect("stats recorded");
    assert_eq!(stats.results_published, 1);
    assert!(stats.session_id.starts_with("transcribe-"));
    assert!(stats.ended_at.is_some());
}

#[tokio::test]
async fn test_backend_closing_without_final_completes_cleanly() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(probe.clone(), vec![ScriptedEvent::Partial("Lorem".into())]),
    );

    let items = collect(engine.start_session().await).await;

    assert_eq!(items, vec![Ok(TranscriptionResult::partial("Lorem"))]);
    assert_eq!(termination(&engine).await, Some(TerminationReason::Completed));
    assert!(probe.all_released());
}

#[tokio::test]
async fn test_mid_stream_failure() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(
            probe.clone(),
            vec![
                ScriptedEvent::Partial("Hello".into()),
                ScriptedEvent::Failure("network down".into()),
            ],
        ),
    );

    let items = collect(engine.start_session().await).await;

    assert_eq!(
        items,
        vec![
            Ok(TranscriptionResult::partial("Hello")),
            Err(SessionError::RecognitionFailed("network down".into())),
        ]
    );
    assert_eq!(probe.capture_stopped(), 1);
    assert_eq!(probe.recognition_cancelled(), 1);
    assert_eq!(termination(&engine).await, Some(TerminationReason::RecognitionFailed));
}

#[tokio::test]
async fn test_capture_config_failure_yields_no_items() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()).failing_configure("category rejected"),
        ScriptedRecognizer::new(probe.clone(), vec![ScriptedEvent::Final("unused".into())]),
    );

    let items = collect(engine.start_session().await).await;

    assert_eq!(items, vec![Err(SessionError::CaptureConfig("category rejected".into()))]);
    assert_eq!(probe.capture_stopped(), 0, "Nothing was acquired, nothing to release");
    assert_eq!(probe.recognition_begun(), 0);
    assert_eq!(termination(&engine).await, Some(TerminationReason::CaptureConfigFailed));
}

#[tokio::test]
async fn test_capture_start_failure_releases_recognition() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()).failing_start("device busy"),
        ScriptedRecognizer::new(probe.clone(), vec![ScriptedEvent::Partial("never".into())]),
    );

    let items = collect(engine.start_session().await).await;

    assert_eq!(items, vec![Err(SessionError::CaptureStart("device busy".into()))]);
    assert_eq!(probe.recognition_begun(), 1);
    assert_eq!(probe.recognition_cancelled(), 1, "No recognition handle may remain");
    assert_eq!(probe.capture_stopped(), 1);
    assert_eq!(termination(&engine).await, Some(TerminationReason::CaptureStartFailed));
}

#[tokio::test]
async fn test_recognition_unavailable_releases_capture() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(probe.clone(), Vec::new()).unavailable("locale not supported"),
    );

    let items = collect(engine.start_session().await).await;

    assert_eq!(
        items,
        vec![Err(SessionError::RecognitionUnavailable("locale not supported".into()))]
    );
    assert_eq!(probe.capture_configured(), 1);
    assert_eq!(probe.capture_started(), 0);
    assert_eq!(probe.capture_stopped(), 1);
}

#[tokio::test]
async fn test_finish_mid_stream_completes_without_error() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(probe.clone(), vec![ScriptedEvent::Partial("Hello".into())])
            .hold_open(),
    );

    let mut stream = engine.start_session().await;
    let first = next_item(&mut stream).await;
    assert_eq!(first, Some(Ok(TranscriptionResult::partial("Hello"))));
    assert!(engine.is_active().await);

    engine.finish_session().await;

    assert_eq!(next_item(&mut stream).await, None, "Stream ends cleanly");
    assert!(!engine.is_active().await);
    assert_eq!(probe.capture_stopped(), 1);
    assert_eq!(probe.recognition_cancelled(), 1);
    assert_eq!(termination(&engine).await, Some(TerminationReason::Cancelled));
}

#[tokio::test]
async fn test_finish_is_idempotent() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(probe.clone(), Vec::new()).hold_open(),
    );

    // No session yet
    engine.finish_session().await;

    let stream = engine.start_session().await;
    engine.finish_session().await;
    engine.finish_session().await;

    assert!(collect(stream).await.is_empty());
    assert_eq!(probe.capture_stopped(), 1);
    assert!(probe.all_released());
}

#[tokio::test]
async fn test_finish_after_natural_completion_is_noop() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(probe.clone(), vec![ScriptedEvent::Final("done".into())]),
    );

    collect(engine.start_session().await).await;
    engine.finish_session().await;

    assert_eq!(probe.capture_stopped(), 1);
    assert_eq!(termination(&engine).await, Some(TerminationReason::Completed));
}

#[tokio::test]
async fn test_start_while_active_supersedes_previous_session() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(probe.clone(), vec![ScriptedEvent::Partial("Hello".into())])
            .hold_open(),
    );

    let mut first = engine.start_session().await;
    assert!(next_item(&mut first).await.is_some());

    let mut second = engine.start_session().await;

    // Previous session completed cleanly and released before the new one acquired
    assert_eq!(next_item(&mut first).await, None);
    assert_eq!(probe.capture_stopped(), 1);

    assert_eq!(
        next_item(&mut second).await,
        Some(Ok(TranscriptionResult::partial("Hello")))
    );
    assert_eq!(probe.capture_configured(), 2);
    assert_eq!(probe.capture_stopped(), 1);

    engine.finish_session().await;
    assert_eq!(next_item(&mut second).await, None);
    assert!(probe.all_released());
}

#[tokio::test]
async fn test_dropping_stream_cancels_session() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(probe.clone(), vec![ScriptedEvent::Partial("Hello".into())])
            .hold_open(),
    );

    let mut stream = engine.start_session().await;
    assert!(next_item(&mut stream).await.is_some());
    drop(stream);

    wait_until_inactive(&engine).await;

    assert_eq!(termination(&engine).await, Some(TerminationReason::Cancelled));
    assert_eq!(probe.capture_stopped(), 1);
    assert_eq!(probe.recognition_cancelled(), 1);

    engine.finish_session().await;
    assert_eq!(probe.capture_stopped(), 1, "No second release");
}

#[tokio::test]
async fn test_frames_forwarded_in_capture_order() {
    let probe = Probe::new();
    let frames = (0..4).map(|i| silent_frame(i * 100)).collect();
    let engine = engine(
        ScriptedCapture::new(probe.clone())
            .with_frames(frames)
            .end_after_frames(),
        ScriptedRecognizer::new(probe.clone(), Vec::new()).final_on_end_audio("all audio heard"),
    );

    let items = collect(engine.start_session().await).await;

    assert_eq!(items, vec![Ok(TranscriptionResult::final_result("all audio heard"))]);
    assert_eq!(probe.appended_timestamps(), vec![0, 100, 200, 300]);
    assert_eq!(probe.audio_ended(), 1);

    let stats = engine.last_session_stats().await.expect("stats recorded");
    assert_eq!(stats.frames_forwarded, 4);
    assert_eq!(stats.termination, Some(TerminationReason::Completed));
}

#[tokio::test]
async fn test_authorization_passthrough_and_failure() {
    let probe = Probe::new();
    let restricted = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(probe.clone(), Vec::new())
            .with_authorization(AuthorizationStatus::Restricted),
    );
    let broken = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(probe.clone(), Vec::new()).failing_authorization("no callback"),
    );

    assert_eq!(restricted.request_authorization().await, AuthorizationStatus::Restricted);
    assert_eq!(broken.request_authorization().await, AuthorizationStatus::Denied);

    // Asking for permission acquires nothing
    assert_eq!(probe.capture_configured(), 0);
    assert_eq!(probe.recognition_begun(), 0);
}

#[tokio::test]
async fn test_shared_capture_allows_one_session_system_wide() -> Result<()> {
    let probe = Probe::new();
    let (first, second) = engines_sharing_capture(&probe);

    let mut first_stream = first.start_session().await;
    assert!(next_item(&mut first_stream).await.is_some());

    let mut second_stream = timeout(TIMEOUT, second.start_session()).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(second.is_active().await, "Second session is starting");
    assert_eq!(probe.capture_configured(), 1, "Second engine waits for the capture device");

    first.finish_session().await;

    assert!(next_item(&mut second_stream).await.is_some());
    assert_eq!(probe.capture_configured(), 2);

    second.finish_session().await;
    assert!(probe.all_released());

    Ok(())
}

#[tokio::test]
async fn test_finish_while_waiting_for_capture_returns_promptly() -> Result<()> {
    let probe = Probe::new();
    let (first, second) = engines_sharing_capture(&probe);

    let mut first_stream = first.start_session().await;
    assert!(next_item(&mut first_stream).await.is_some());

    let second_stream = timeout(TIMEOUT, second.start_session()).await?;
    assert!(timeout(TIMEOUT, second.is_active()).await?);

    timeout(TIMEOUT, second.finish_session()).await?;

    assert!(!second.is_active().await);
    assert!(collect(second_stream).await.is_empty(), "Giving up the wait is not an error");
    assert_eq!(termination(&second).await, Some(TerminationReason::Cancelled));
    assert_eq!(probe.capture_configured(), 1, "Waiting session never touched the device");

    assert!(first.is_active().await);
    first.finish_session().await;
    assert!(probe.all_released());

    Ok(())
}

#[tokio::test]
async fn test_metadata_only_on_final_result() {
    let probe = Probe::new();
    let metadata = SessionMetadata::new(Duration::from_millis(200), 140.0);
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(
            probe.clone(),
            vec![
                ScriptedEvent::PartialResult(
                    TranscriptionResult::partial("Lorem").with_metadata(metadata.clone()),
                ),
                // Backend flags disagree with the event kind
                ScriptedEvent::PartialResult(TranscriptionResult::final_result("Lorem ip")),
                ScriptedEvent::FinalResult(
                    TranscriptionResult::final_result("Lorem ipsum")
                        .with_metadata(metadata.clone()),
                ),
            ],
        ),
    );

    let items = collect(engine.start_session().await).await;

    assert_eq!(
        items,
        vec![
            Ok(TranscriptionResult::partial("Lorem")),
            Ok(TranscriptionResult::partial("Lorem ip")),
            Ok(TranscriptionResult::final_result("Lorem ipsum").with_metadata(metadata)),
        ]
    );
}

#[tokio::test]
async fn test_stats_follow_running_session() {
    let probe = Probe::new();
    let engine = engine(
        ScriptedCapture::new(probe.clone()),
        ScriptedRecognizer::new(probe.clone(), vec![ScriptedEvent::Partial("Hello".into())])
            .hold_open(),
    );

    let mut stream = engine.start_session().await;
    assert!(next_item(&mut stream).await.is_some());

    let stats = timeout(TIMEOUT, async {
        loop {
            match engine.last_session_stats().await {
                Some(stats) if stats.results_published == 1 => break stats,
                _ => tokio::time::sleep(Duration::from_millis(5)).await,
            }
        }
    })
    .await
    .expect("published result should show in stats");
    assert!(stats.termination.is_none(), "Session is still running");
    assert!(stats.ended_at.is_none());

    engine.finish_session().await;
    assert_eq!(termination(&engine).await, Some(TerminationReason::Cancelled));
}
