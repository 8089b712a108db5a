//! Response body types supporting buffered, streaming, and empty modes.
//!
//! [`ResponseBody`] is the body type of every gateway response:
//!
//! - **Buffered**: small static responses built in one piece.
//! - **Streaming**: frames fed by a producer task through a bounded channel. This is
//!   what the [`ChannelOutput`](crate::output::ChannelOutput) hands to hyper, both for
//!   sink-buffered pages (one frame plus `Content-Length`) and chunked archives.
//! - **Empty**: redirects, `404`s, and other header-only responses.
//!
//! A streaming producer can end the body with an error frame, which makes hyper
//! drop the connection instead of terminating the chunked encoding cleanly.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::Full;
use tokio::sync::mpsc;

/// A frame sent from the producer task to the response body.
pub type BodyFrame = Result<Bytes, std::io::Error>;

/// Gateway response body.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper responses.
#[derive(Debug, Default)]
pub enum ResponseBody {
    /// Buffered body for small static responses.
    Buffered(Full<Bytes>),
    /// Frames produced by a request task.
    Streaming(mpsc::Receiver<BodyFrame>),
    /// Empty body for redirects and header-only responses.
    #[default]
    Empty,
}

impl ResponseBody {
    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }

    /// Create a body fed by the given channel.
    #[must_use]
    pub fn streaming(receiver: mpsc::Receiver<BodyFrame>) -> Self {
        Self::Streaming(receiver)
    }
}

impl http_body::Body for ResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Streaming(receiver) => receiver
                .poll_recv(cx)
                .map(|frame| frame.map(|data| data.map(http_body::Frame::data))),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Streaming(_) => false,
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Streaming(_) => http_body::SizeHint::default(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body::Body;
    use http_body_util::BodyExt;

    use super::*;

    #[test]
    fn test_should_report_empty_body_as_end_of_stream() {
        let body = ResponseBody::empty();
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
    }

    #[test]
    fn test_should_create_buffered_body_from_string() {
        let body = ResponseBody::from_string("hello world");
        assert!(!body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(11));
    }

    #[test]
    fn test_should_default_to_empty() {
        let body = ResponseBody::default();
        assert!(body.is_end_stream());
    }

    #[tokio::test]
    async fn test_should_stream_frames_until_sender_drops() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Ok(Bytes::from_static(b"hello "))).await.expect("send");
        tx.send(Ok(Bytes::from_static(b"world"))).await.expect("send");
        drop(tx);

        let collected = ResponseBody::streaming(rx)
            .collect()
            .await
            .expect("body")
            .to_bytes();
        assert_eq!(collected, Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn test_should_surface_error_frame() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Ok(Bytes::from_static(b"partial"))).await.expect("send");
        tx.send(Err(std::io::Error::other("aborted")))
            .await
            .expect("send");
        drop(tx);

        assert!(ResponseBody::streaming(rx).collect().await.is_err());
    }
}
