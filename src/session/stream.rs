use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::SessionError;
use crate::transcript::TranscriptionResult;

/// One item of a session stream
pub type SessionItem = Result<TranscriptionResult, SessionError>;

/// Ordered stream of results for one session
///
/// Ends with `None` after the final result, after `finish_session`, or right
/// after a terminal error item. Dropping the stream cancels the session.
pub struct SessionStream {
    inner: UnboundedReceiverStream<SessionItem>,
}

impl SessionStream {
    /// Create a stream and the sender that feeds it
    pub fn channel() -> (mpsc::UnboundedSender<SessionItem>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                inner: UnboundedReceiverStream::new(rx),
            },
        )
    }
}

impl Stream for SessionStream {
    type Item = SessionItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
