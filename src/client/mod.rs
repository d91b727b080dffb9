//! Client facade for presentation code
//!
//! `TranscriptionClient` is the narrow surface a UI depends on. The live
//! implementation is `SessionEngine`; `PreviewClient` streams canned output.

mod live;
mod preview;

pub use preview::{PreviewClient, PreviewScript, PREVIEW_TEXT};

use crate::recognition::AuthorizationStatus;
use crate::session::SessionStream;

#[async_trait::async_trait]
pub trait TranscriptionClient: Send + Sync {
    /// Ask for speech recognition permission (never fails)
    async fn request_authorization(&self) -> AuthorizationStatus;

    /// Start a session and return its result stream
    async fn start_session(&self) -> SessionStream;

    /// Finish the current session; no-op if there is none
    async fn finish_session(&self);
}
