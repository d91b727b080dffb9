// Canned transcription client for previews and presentation tests
//
// Satisfies the same surface as the live engine without touching audio or a
// recognizer. Output is fully scripted, so tests do not depend on timing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::TranscriptionClient;
use crate::error::SessionError;
use crate::recognition::AuthorizationStatus;
use crate::session::{SessionItem, SessionStream};
use crate::transcript::TranscriptionResult;

pub const PREVIEW_TEXT: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
    eiusmod tempor incididunt ut labore et dolore magna aliqua.";

/// What a preview session streams
#[derive(Debug, Clone)]
pub enum PreviewScript {
    /// Reveal `text` one word at a time, the last word as the final result
    Words { text: String, interval: Duration },
    /// Yield exactly these items, stopping after the first error
    Items(Vec<SessionItem>),
}

impl Default for PreviewScript {
    fn default() -> Self {
        PreviewScript::Words {
            text: PREVIEW_TEXT.to_string(),
            interval: Duration::from_millis(300),
        }
    }
}

struct PreviewRun {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct PreviewClient {
    authorization: AuthorizationStatus,
    script: PreviewScript,
    running: Mutex<Option<PreviewRun>>,
    sessions_started: AtomicUsize,
}

impl PreviewClient {
    pub fn new(authorization: AuthorizationStatus, script: PreviewScript) -> Self {
        Self {
            authorization,
            script,
            running: Mutex::new(None),
            sessions_started: AtomicUsize::new(0),
        }
    }

    /// Authorized client streaming the default preview text
    pub fn preview() -> Self {
        Self::new(AuthorizationStatus::Authorized, PreviewScript::default())
    }

    /// Authorized client whose sessions yield `items` and end
    pub fn scripted(items: Vec<SessionItem>) -> Self {
        Self::new(AuthorizationStatus::Authorized, PreviewScript::Items(items))
    }

    /// Authorized client whose sessions end immediately with `err`
    pub fn failing(err: SessionError) -> Self {
        Self::scripted(vec![Err(err)])
    }

    /// Number of times `start_session` was called
    pub fn sessions_started(&self) -> usize {
        self.sessions_started.load(Ordering::SeqCst)
    }

    async fn stop_running(&self) {
        if let Some(run) = self.running.lock().await.take() {
            run.cancel.cancel();
            // Aborted or finished either way; nothing to report
            let _ = run.handle.await;
        }
    }
}

#[async_trait::async_trait]
impl TranscriptionClient for PreviewClient {
    async fn request_authorization(&self) -> AuthorizationStatus {
        self.authorization
    }

    async fn start_session(&self) -> SessionStream {
        self.stop_running().await;

        let (tx, stream) = SessionStream::channel();
        let cancel = CancellationToken::new();
        let script = self.script.clone();

        info!("Starting preview session");
        let handle = tokio::spawn(play(script, tx, cancel.clone()));

        *self.running.lock().await = Some(PreviewRun { cancel, handle });
        self.sessions_started.fetch_add(1, Ordering::SeqCst);
        stream
    }

    async fn finish_session(&self) {
        self.stop_running().await;
    }
}

async fn play(
    script: PreviewScript,
    tx: mpsc::UnboundedSender<SessionItem>,
    cancel: CancellationToken,
) {
    match script {
        PreviewScript::Words { text, interval } => {
            let words: Vec<&str> = text.split_whitespace().collect();
            let mut current = String::new();

            for (i, word) in words.iter().enumerate() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tx.closed() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);

                let result = if i + 1 == words.len() {
                    TranscriptionResult::final_result(current.clone())
                } else {
                    TranscriptionResult::partial(current.clone())
                };
                if tx.send(Ok(result)).is_err() {
                    break;
                }
            }
        }
        PreviewScript::Items(items) => {
            for item in items {
                if cancel.is_cancelled() {
                    break;
                }
                let is_err = item.is_err();
                if tx.send(item).is_err() || is_err {
                    break;
                }
            }
        }
    }
    debug!("Preview session ended");
}
