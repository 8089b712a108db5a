//! The real output channel a response is written to.
//!
//! [`ResponseOutput`] is the low-level destination the [`StreamSink`](crate::sink::StreamSink)
//! wraps: it commits a response head once, then accepts body bytes. The hyper
//! implementation, [`ChannelOutput`], hands the head to the service future through a
//! oneshot channel and feeds the body through a bounded mpsc channel, so a slow
//! client applies backpressure to the producer.

use std::future::Future;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::body::{BodyFrame, ResponseBody};

/// Status line and headers of a response, without a body.
pub type ResponseHead = http::Response<()>;

/// Receiving end of the response head produced by a [`ChannelOutput`].
pub type PendingResponse = oneshot::Receiver<http::Response<ResponseBody>>;

/// Number of body frames buffered between the producer task and hyper.
const BODY_CHANNEL_DEPTH: usize = 8;

/// Errors writing to a [`ResponseOutput`].
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// The head was already committed.
    #[error("response head already sent")]
    HeadAlreadySent,

    /// Body bytes were written before the head.
    #[error("response head not sent")]
    HeadNotSent,

    /// The client went away; nothing more can be delivered.
    #[error("client disconnected")]
    Disconnected,
}

/// Destination of a single HTTP response.
pub trait ResponseOutput: Send {
    /// Commit the status line and headers; the body follows through [`write`](Self::write).
    fn write_head(&mut self, head: ResponseHead) -> Result<(), OutputError>;

    /// Commit a response that has no body.
    fn write_empty(&mut self, head: ResponseHead) -> Result<(), OutputError>;

    /// Send body bytes after the head.
    fn write(&mut self, data: Bytes) -> impl Future<Output = Result<(), OutputError>> + Send;

    /// End the response abruptly so the client sees a truncated transfer.
    fn terminate(&mut self) -> impl Future<Output = ()> + Send;
}

/// [`ResponseOutput`] that feeds a hyper response through channels.
#[derive(Debug)]
pub struct ChannelOutput {
    head: Option<oneshot::Sender<http::Response<ResponseBody>>>,
    body: Option<mpsc::Sender<BodyFrame>>,
}

impl ChannelOutput {
    /// Create an output and the receiver the service awaits for the response head.
    #[must_use]
    pub fn channel() -> (Self, PendingResponse) {
        let (head, pending) = oneshot::channel();
        (
            Self {
                head: Some(head),
                body: None,
            },
            pending,
        )
    }

    fn send_head(&mut self, response: http::Response<ResponseBody>) -> Result<(), OutputError> {
        let head = self.head.take().ok_or(OutputError::HeadAlreadySent)?;
        head.send(response).map_err(|_| OutputError::Disconnected)
    }
}

impl ResponseOutput for ChannelOutput {
    fn write_head(&mut self, head: ResponseHead) -> Result<(), OutputError> {
        let (tx, rx) = mpsc::channel(BODY_CHANNEL_DEPTH);
        let (parts, ()) = head.into_parts();
        self.send_head(http::Response::from_parts(parts, ResponseBody::streaming(rx)))?;
        self.body = Some(tx);
        Ok(())
    }

    fn write_empty(&mut self, head: ResponseHead) -> Result<(), OutputError> {
        let (parts, ()) = head.into_parts();
        self.send_head(http::Response::from_parts(parts, ResponseBody::empty()))
    }

    async fn write(&mut self, data: Bytes) -> Result<(), OutputError> {
        let body = self.body.as_ref().ok_or(OutputError::HeadNotSent)?;
        body.send(Ok(data))
            .await
            .map_err(|_| OutputError::Disconnected)
    }

    async fn terminate(&mut self) {
        if let Some(body) = self.body.take() {
            let _ = body
                .send(Err(std::io::Error::other("response aborted")))
                .await;
        }
    }
}

/// Output that records every call, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingOutput {
    pub heads: Vec<ResponseHead>,
    pub writes: Vec<Bytes>,
    pub terminated: bool,
}

#[cfg(test)]
impl RecordingOutput {
    pub fn body(&self) -> Vec<u8> {
        self.writes.concat()
    }

    pub fn header(&self, name: http::header::HeaderName) -> Option<&str> {
        self.heads
            .first()
            .and_then(|head| head.headers().get(name))
            .and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
impl ResponseOutput for RecordingOutput {
    fn write_head(&mut self, head: ResponseHead) -> Result<(), OutputError> {
        self.heads.push(head);
        Ok(())
    }

    fn write_empty(&mut self, head: ResponseHead) -> Result<(), OutputError> {
        self.heads.push(head);
        Ok(())
    }

    async fn write(&mut self, data: Bytes) -> Result<(), OutputError> {
        if self.heads.is_empty() {
            return Err(OutputError::HeadNotSent);
        }
        self.writes.push(data);
        Ok(())
    }

    async fn terminate(&mut self) {
        self.terminated = true;
    }
}
