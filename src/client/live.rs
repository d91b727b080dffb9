use super::TranscriptionClient;
use crate::recognition::AuthorizationStatus;
use crate::session::{SessionEngine, SessionStream};

#[async_trait::async_trait]
impl TranscriptionClient for SessionEngine {
    async fn request_authorization(&self) -> AuthorizationStatus {
        SessionEngine::request_authorization(self).await
    }

    async fn start_session(&self) -> SessionStream {
        SessionEngine::start_session(self).await
    }

    async fn finish_session(&self) {
        SessionEngine::finish_session(self).await
    }
}
