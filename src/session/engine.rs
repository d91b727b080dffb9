use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::state::{SessionState, TerminationReason};
use super::stats::SessionStats;
use super::stream::{SessionItem, SessionStream};
use crate::audio::{AudioCapture, AudioFrame, FrameSink};
use crate::error::SessionError;
use crate::recognition::{
    AuthorizationStatus, RecognitionEvent, RecognitionHandle, RecognitionTask, Recognizer,
};
use crate::transcript::TranscriptionResult;

/// Capture device shared between engines; a running session holds the lock
pub type SharedCapture = Arc<Mutex<Box<dyn AudioCapture>>>;

/// Owns at most one live transcription session at a time
///
/// Each session runs in its own task, which is the only place session state
/// changes. Capture frames and recognition events reach that task through
/// channels; `finish_session` and dropping the stream reach it through a
/// cancellation token and the closed output channel.
///
/// Starting a session while another is active first finishes the previous one:
/// its stream completes without error and its resources are released before
/// the new session acquires the capture device.
pub struct SessionEngine {
    config: SessionConfig,
    capture: SharedCapture,
    recognizer: Arc<dyn Recognizer>,
    slot: Mutex<Option<ActiveSession>>,
    last_stats: Arc<Mutex<Option<SessionStats>>>,
}

struct ActiveSession {
    session_id: String,
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
    handle: JoinHandle<()>,
}

impl ActiveSession {
    fn is_active(&self) -> bool {
        self.state.borrow().is_active()
    }

    /// Cancel the session (no-op if it already terminated) and wait for teardown
    async fn finish(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            error!("Session task {} panicked: {}", self.session_id, e);
        }
    }
}

impl SessionEngine {
    pub fn new(
        capture: Box<dyn AudioCapture>,
        recognizer: Arc<dyn Recognizer>,
        config: SessionConfig,
    ) -> Self {
        Self::with_shared_capture(Arc::new(Mutex::new(capture)), recognizer, config)
    }

    /// Create an engine over a capture device that other engines may also use
    pub fn with_shared_capture(
        capture: SharedCapture,
        recognizer: Arc<dyn Recognizer>,
        config: SessionConfig,
    ) -> Self {
        info!(
            "Session engine initialized (recognizer: {}, frame queue: {})",
            recognizer.name(),
            config.frame_queue_capacity
        );

        Self {
            config,
            capture,
            recognizer,
            slot: Mutex::new(None),
            last_stats: Arc::new(Mutex::new(None)),
        }
    }

    /// Query the recognizer for permission. Errors are reported as `Denied`.
    pub async fn request_authorization(&self) -> AuthorizationStatus {
        match self.recognizer.request_authorization().await {
            Ok(status) => {
                info!("Speech recognition authorization: {}", status);
                status
            }
            Err(e) => {
                warn!("Authorization request failed, treating as denied: {:#}", e);
                AuthorizationStatus::Denied
            }
        }
    }

    /// Start a new session and return its result stream
    ///
    /// Failures to acquire capture or recognition are delivered as the
    /// stream's terminal error, never as a return value. If another engine's
    /// session holds the capture device, the new session waits for it in the
    /// background and can still be finished while waiting.
    pub async fn start_session(&self) -> SessionStream {
        let mut slot = self.slot.lock().await;

        if let Some(previous) = slot.take() {
            if previous.is_active() {
                info!("Superseding active session: {}", previous.session_id);
            }
            previous.finish().await;
        }

        let session_id = self.config.next_session_id();
        info!("Starting transcription session: {}", session_id);

        let (output, stream) = SessionStream::channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let cancel = CancellationToken::new();

        let runner = SessionRunner {
            stats: SessionStats::new(session_id.clone()),
            recognizer: Arc::clone(&self.recognizer),
            output,
            cancel: cancel.clone(),
            state: state_tx,
            frame_queue_capacity: self.config.frame_queue_capacity,
            last_stats: Arc::clone(&self.last_stats),
        };

        runner.set_state(SessionState::Starting);
        let handle = tokio::spawn(runner.run(Arc::clone(&self.capture)));

        *slot = Some(ActiveSession {
            session_id,
            cancel,
            state: state_rx,
            handle,
        });

        stream
    }

    /// Finish the current session, if any
    ///
    /// Idempotent. Returns once the session's resources are released; its
    /// stream then completes without error.
    pub async fn finish_session(&self) {
        let active = self.slot.lock().await.take();

        match active {
            Some(session) => {
                if session.is_active() {
                    info!("Finishing transcription session: {}", session.session_id);
                } else {
                    debug!("Session {} already terminated", session.session_id);
                }
                session.finish().await;
            }
            None => debug!("No transcription session to finish"),
        }
    }

    /// Whether a session is currently starting, streaming or tearing down
    pub async fn is_active(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .is_some_and(ActiveSession::is_active)
    }

    /// Stats of the running session, or of the last one that ended
    ///
    /// Refreshed when a session starts, on every published result and at
    /// termination. `frames_forwarded` of a running session may lag.
    pub async fn last_session_stats(&self) -> Option<SessionStats> {
        self.last_stats.lock().await.clone()
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        if let Some(session) = self.slot.get_mut().take() {
            session.cancel.cancel();
        }
    }
}

/// Resources held by one session, released exactly once
struct SessionResources {
    capture: OwnedMutexGuard<Box<dyn AudioCapture>>,
    capture_configured: bool,
    recognition: Option<Box<dyn RecognitionTask>>,
    frames: Option<mpsc::Receiver<AudioFrame>>,
    released: bool,
}

impl SessionResources {
    fn new(capture: OwnedMutexGuard<Box<dyn AudioCapture>>) -> Self {
        Self {
            capture,
            capture_configured: false,
            recognition: None,
            frames: None,
            released: false,
        }
    }

    /// Release in reverse acquisition order: recognition, frame sink, capture
    async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Some(mut task) = self.recognition.take() {
            task.cancel();
            debug!("Recognition task cancelled");
        }

        // Detaches the sink handed to the capture
        self.frames = None;

        if self.capture_configured {
            self.capture_configured = false;
            let name = self.capture.name().to_string();
            match self.capture.stop().await {
                Ok(()) => debug!("Capture stopped: {}", name),
                Err(e) => error!("Failed to stop capture {}: {:#}", name, e),
            }
        }
    }
}

struct SessionRunner {
    stats: SessionStats,
    recognizer: Arc<dyn Recognizer>,
    output: mpsc::UnboundedSender<SessionItem>,
    cancel: CancellationToken,
    state: watch::Sender<SessionState>,
    frame_queue_capacity: usize,
    last_stats: Arc<Mutex<Option<SessionStats>>>,
}

impl SessionRunner {
    async fn run(mut self, capture: SharedCapture) {
        self.snapshot_stats().await;

        let outcome = match self.claim_device(capture).await {
            Some(device) => {
                let mut resources = SessionResources::new(device);
                let outcome = match self.acquire(&mut resources).await {
                    Ok(Some(events)) => self.stream(&mut resources, events).await,
                    Ok(None) => Ok(TerminationReason::Cancelled),
                    Err(err) => Err(err),
                };

                if *self.state.borrow() == SessionState::Streaming {
                    self.set_state(SessionState::Finishing);
                }
                resources.release().await;
                outcome
            }
            None => {
                debug!(
                    "Session {} cancelled while waiting for the capture device",
                    self.stats.session_id
                );
                Ok(TerminationReason::Cancelled)
            }
        };

        let reason = match outcome {
            Ok(reason) => reason,
            Err(err) => {
                warn!("Session {} failed: {}", self.stats.session_id, err);
                let reason = TerminationReason::from(&err);
                // Consumer may already be gone
                let _ = self.output.send(Err(err));
                reason
            }
        };

        self.stats.finish(reason);
        self.snapshot_stats().await;
        self.set_state(SessionState::Terminated(reason));

        info!(
            "Session {} terminated: {:?} ({} frames, {} results, {:.1}s)",
            self.stats.session_id,
            reason,
            self.stats.frames_forwarded,
            self.stats.results_published,
            self.stats.duration_secs()
        );
        // Dropping `self.output` completes the stream
    }

    /// Lock the capture device, giving up if the session is cancelled first
    async fn claim_device(
        &self,
        capture: SharedCapture,
    ) -> Option<OwnedMutexGuard<Box<dyn AudioCapture>>> {
        if let Ok(device) = Arc::clone(&capture).try_lock_owned() {
            return Some(device);
        }

        info!("Session {} waiting for the capture device", self.stats.session_id);
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => None,
            _ = self.output.closed() => None,
            device = capture.lock_owned() => Some(device),
        }
    }

    /// Acquire capture, then recognition, then start capture
    ///
    /// Returns `Ok(None)` if the session was cancelled while starting.
    async fn acquire(
        &mut self,
        resources: &mut SessionResources,
    ) -> Result<Option<mpsc::Receiver<RecognitionEvent>>, SessionError> {
        let capture_name = resources.capture.name().to_string();

        resources
            .capture
            .configure_for_voice_capture()
            .await
            .map_err(|e| {
                error!("Failed to configure capture {}: {:#}", capture_name, e);
                SessionError::capture_config(&e)
            })?;
        resources.capture_configured = true;

        if self.should_stop() {
            return Ok(None);
        }

        let RecognitionHandle { task, events } =
            self.recognizer.begin_recognition().await.map_err(|e| {
                error!(
                    "Failed to begin recognition on {}: {:#}",
                    self.recognizer.name(),
                    e
                );
                SessionError::recognition_unavailable(&e)
            })?;
        resources.recognition = Some(task);

        if self.should_stop() {
            return Ok(None);
        }

        let (sink, frames) = FrameSink::channel(self.frame_queue_capacity);
        resources.frames = Some(frames);

        resources.capture.start(sink).await.map_err(|e| {
            error!("Failed to start capture {}: {:#}", capture_name, e);
            SessionError::capture_start(&e)
        })?;

        info!(
            "Session {} capturing from {} into {}",
            self.stats.session_id,
            capture_name,
            self.recognizer.name()
        );

        Ok(Some(events))
    }

    /// Forward frames and publish events until a terminal signal arrives
    async fn stream(
        &mut self,
        resources: &mut SessionResources,
        mut events: mpsc::Receiver<RecognitionEvent>,
    ) -> Result<TerminationReason, SessionError> {
        self.set_state(SessionState::Streaming);
        let mut audio_open = true;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("Session {} finish requested", self.stats.session_id);
                    return Ok(TerminationReason::Cancelled);
                }

                _ = self.output.closed() => {
                    info!("Session {} stream dropped by consumer", self.stats.session_id);
                    return Ok(TerminationReason::Cancelled);
                }

                event = events.recv() => match event {
                    Some(RecognitionEvent::Partial(mut result)) => {
                        // Metadata belongs to the final result only
                        result.is_final = false;
                        result.metadata = None;
                        if !self.publish(result) {
                            return Ok(TerminationReason::Cancelled);
                        }
                        self.snapshot_stats().await;
                    }
                    Some(RecognitionEvent::Final(mut result)) => {
                        result.is_final = true;
                        if !self.publish(result) {
                            return Ok(TerminationReason::Cancelled);
                        }
                        return Ok(TerminationReason::Completed);
                    }
                    Some(RecognitionEvent::Failure(e)) => {
                        return Err(SessionError::recognition_failed(&e));
                    }
                    None => {
                        debug!("Recognizer closed session {}", self.stats.session_id);
                        return Ok(TerminationReason::Completed);
                    }
                },

                frame = next_frame(&mut resources.frames), if audio_open => match frame {
                    Some(frame) => {
                        if let Some(task) = resources.recognition.as_mut() {
                            task.append(frame);
                            self.stats.frames_forwarded += 1;
                        }
                    }
                    None => {
                        debug!("Capture ended for session {}", self.stats.session_id);
                        audio_open = false;
                        if let Some(task) = resources.recognition.as_mut() {
                            task.end_audio();
                        }
                    }
                },
            }
        }
    }

    fn publish(&mut self, result: TranscriptionResult) -> bool {
        debug!(
            "Session {} result (final={}): {}",
            self.stats.session_id,
            result.is_final,
            result.formatted_text()
        );

        if self.output.send(Ok(result)).is_err() {
            return false;
        }
        self.stats.results_published += 1;
        true
    }

    async fn snapshot_stats(&self) {
        *self.last_stats.lock().await = Some(self.stats.clone());
    }

    fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.output.is_closed()
    }

    fn set_state(&self, state: SessionState) {
        self.state.send_replace(state);
    }
}

async fn next_frame(frames: &mut Option<mpsc::Receiver<AudioFrame>>) -> Option<AudioFrame> {
    match frames {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
