//! Content-encoding negotiation and compression.
//!
//! The client's `Accept-Encoding` list is walked in order and the first coding
//! the gateway supports wins. Compression is only ever applied to a fully
//! buffered body by [`StreamSink::complete`](crate::sink::StreamSink::complete);
//! streamed responses go out uncompressed.

use std::io::Write;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};
use http::HeaderMap;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, HeaderValue, VARY};

/// Brotli quality used for pages; favours speed over ratio.
const BROTLI_QUALITY: u32 = 5;
/// Brotli window size (log2).
const BROTLI_WINDOW: u32 = 22;
const BROTLI_BUFFER: usize = 4096;

/// A content coding the gateway can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    /// `gzip`.
    Gzip,
    /// `x-gzip`, the legacy alias of gzip; echoed back as requested.
    XGzip,
    /// `deflate` (zlib wrapped).
    Deflate,
    /// `br`.
    Brotli,
}

impl ContentEncoding {
    /// Map a coding token to a supported encoding.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "gzip" => Some(Self::Gzip),
            "x-gzip" => Some(Self::XGzip),
            "deflate" => Some(Self::Deflate),
            "br" => Some(Self::Brotli),
            _ => None,
        }
    }

    /// Pick the first supported coding of an `Accept-Encoding` value.
    ///
    /// Parameters are ignored except for `q=0`, which rules a coding out.
    /// Malformed entries are skipped.
    #[must_use]
    pub fn negotiate(accept_encoding: &str) -> Option<Self> {
        accept_encoding.split(',').find_map(|entry| {
            let mut params = entry.split(';');
            let encoding = Self::from_token(params.next()?.trim())?;

            for param in params {
                let Some(q) = param.trim().strip_prefix("q=") else {
                    continue;
                };
                let q: f32 = q.trim().parse().ok()?;
                if q <= 0.0 {
                    return None;
                }
            }

            Some(encoding)
        })
    }

    /// Negotiate from request headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(ACCEPT_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(Self::negotiate)
    }

    /// Token sent back in `Content-Encoding`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::XGzip => "x-gzip",
            Self::Deflate => "deflate",
            Self::Brotli => "br",
        }
    }

    /// Compress a complete body.
    pub fn encode(self, data: &[u8]) -> std::io::Result<Bytes> {
        let compressed = match self {
            Self::Gzip | Self::XGzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()?
            }
            Self::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                encoder.finish()?
            }
            Self::Brotli => {
                let mut encoder = brotli::CompressorWriter::new(
                    Vec::new(),
                    BROTLI_BUFFER,
                    BROTLI_QUALITY,
                    BROTLI_WINDOW,
                );
                encoder.write_all(data)?;
                encoder.into_inner()
            }
        };
        Ok(Bytes::from(compressed))
    }

    /// Set `Content-Encoding` and add `Accept-Encoding` to `Vary`.
    pub fn apply_headers(self, headers: &mut HeaderMap) {
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static(self.as_str()));
        headers.append(VARY, HeaderValue::from_static("Accept-Encoding"));
    }
}

impl std::fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
