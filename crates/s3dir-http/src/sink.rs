//! Adaptive response sink.
//!
//! A [`StreamSink`] sits between a response producer and its [`ResponseOutput`].
//! It buffers output until either the producer completes, in which case the
//! response goes out in one piece with an exact `Content-Length` (and compressed
//! when the client asked for it), or the buffer would overflow, in which case the
//! headers are committed without a length and everything after is streamed.
//!
//! ```text
//!            write (fits)                     complete
//!   Buffering ----------> Buffering  -----------------------> Flushed
//!       |                                (Content-Length, encoding)
//!       | write (overflows)
//!       +-------------------------------------------------> Flushed
//!                               (chunked, uncompressed)
//! ```
//!
//! The transition is one-way and happens in a single place, so the headers can
//! only ever be written once.

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, HeaderValue};
use tracing::{debug, warn};

use crate::encoding::ContentEncoding;
use crate::output::{OutputError, ResponseHead, ResponseOutput};

/// Bytes buffered before a response switches to streaming (16 MiB).
pub const STREAM_BUFFER_CAPACITY: usize = 16 * 1024 * 1024;

/// Deferred header writer, run exactly once when the response is committed.
pub type HeaderWriter = Box<dyn FnOnce(&mut ResponseHead) + Send>;

enum SinkState {
    Buffering {
        buffer: BytesMut,
        write_headers: HeaderWriter,
    },
    Flushed,
}

/// Write destination that buffers small responses and streams large ones.
pub struct StreamSink<'a, O: ResponseOutput> {
    output: &'a mut O,
    state: SinkState,
    capacity: usize,
    encoding: Option<ContentEncoding>,
    accepted: u64,
}

impl<O: ResponseOutput> std::fmt::Debug for StreamSink<'_, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            SinkState::Buffering { buffer, .. } => format!("Buffering({} bytes)", buffer.len()),
            SinkState::Flushed => "Flushed".to_owned(),
        };
        f.debug_struct("StreamSink")
            .field("state", &state)
            .field("capacity", &self.capacity)
            .field("encoding", &self.encoding)
            .field("accepted", &self.accepted)
            .finish_non_exhaustive()
    }
}

impl<'a, O: ResponseOutput> StreamSink<'a, O> {
    /// Create a sink over `output`.
    ///
    /// `write_headers` sets the status and headers of the response; it runs when
    /// the response is committed, never before.
    pub fn new(output: &'a mut O, write_headers: impl FnOnce(&mut ResponseHead) + Send + 'static) -> Self {
        Self {
            output,
            state: SinkState::Buffering {
                buffer: BytesMut::new(),
                write_headers: Box::new(write_headers),
            },
            capacity: STREAM_BUFFER_CAPACITY,
            encoding: None,
            accepted: 0,
        }
    }

    /// Override the buffer capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Compress the body with `encoding` if the response completes while buffered.
    #[must_use]
    pub fn with_encoding(mut self, encoding: Option<ContentEncoding>) -> Self {
        self.encoding = encoding;
        self
    }

    /// Whether the response head has been committed (or the sink aborted).
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        matches!(self.state, SinkState::Flushed)
    }

    /// Total bytes accepted through [`write`](Self::write).
    #[must_use]
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// The only transition out of `Buffering`.
    fn take_pending(&mut self) -> Option<(BytesMut, HeaderWriter)> {
        match std::mem::replace(&mut self.state, SinkState::Flushed) {
            SinkState::Buffering {
                buffer,
                write_headers,
            } => Some((buffer, write_headers)),
            SinkState::Flushed => None,
        }
    }

    /// Write bytes to the response.
    ///
    /// While they fit in the remaining capacity they are only buffered. The first
    /// write that does not fit commits the headers without a length, flushes the
    /// buffer, and from then on every write goes straight to the output.
    pub async fn write(&mut self, data: Bytes) -> Result<(), OutputError> {
        if data.is_empty() {
            return Ok(());
        }
        self.accepted += data.len() as u64;

        if let SinkState::Buffering { buffer, .. } = &mut self.state {
            if data.len() <= self.capacity.saturating_sub(buffer.len()) {
                buffer.extend_from_slice(&data);
                return Ok(());
            }
        }

        if let Some((buffered, write_headers)) = self.take_pending() {
            debug!(
                buffered = buffered.len(),
                capacity = self.capacity,
                "response buffer exceeded, switching to streaming"
            );
            let mut head = ResponseHead::new(());
            write_headers(&mut head);
            self.output.write_head(head)?;
            if !buffered.is_empty() {
                self.output.write(buffered.freeze()).await?;
            }
        }

        self.output.write(data).await
    }

    /// Finish the response.
    ///
    /// A still-buffered response is compressed (when negotiated), sent with an
    /// exact `Content-Length`, and written in one piece. Once flushed this is a
    /// no-op, so it is always safe to call.
    pub async fn complete(&mut self) -> Result<(), OutputError> {
        let Some((buffered, write_headers)) = self.take_pending() else {
            return Ok(());
        };

        let mut head = ResponseHead::new(());
        write_headers(&mut head);

        let body = match self.encoding {
            Some(encoding) => match encoding.encode(&buffered) {
                Ok(compressed) => {
                    encoding.apply_headers(head.headers_mut());
                    compressed
                }
                Err(err) => {
                    warn!(%encoding, error = %err, "compression failed, sending identity body");
                    buffered.freeze()
                }
            },
            None => buffered.freeze(),
        };

        head.headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        self.output.write_head(head)?;

        if !body.is_empty() {
            self.output.write(body).await?;
        }
        Ok(())
    }

    /// Abandon the response after a failure.
    ///
    /// While nothing has been sent, the buffer is dropped and the untouched output
    /// is handed back so the caller can write a proper error response. Once the
    /// head has gone out there is no clean way to report the error: the output is
    /// terminated so the client sees a truncated transfer, and `None` is returned.
    pub async fn abort(&mut self) -> Option<&mut O> {
        if self.take_pending().is_some() {
            return Some(&mut *self.output);
        }

        self.output.terminate().await;
        None
    }
}
