//! HTTP layer of the s3dir gateway.
//!
//! This crate turns requests into responses on top of the storage capability from
//! `s3dir-core`:
//!
//! - **Adaptive sink** ([`sink`]): buffers small responses so they carry an exact
//!   `Content-Length` and can be compressed, streams large ones.
//! - **Archive assembly** ([`archive`]): streams a zip of a prefix through the sink.
//! - **Rendering** ([`render`], [`view`]): askama pages for buckets, listings,
//!   objects, and errors.
//! - **Service** ([`service`]): hyper `Service` running each request on its own task.
//!
//! # Architecture
//!
//! ```text
//! hyper -> GatewayService -> spawn(Gateway::serve) -> StreamSink -> ChannelOutput
//!                 ^                                                       |
//!                 +------------- response head (oneshot) ----------------+
//!                                 body frames (mpsc) ---------------> hyper
//! ```

pub mod archive;
pub mod body;
pub mod encoding;
pub mod error;
pub mod gateway;
pub mod headers;
pub mod output;
pub mod render;
pub mod router;
pub mod service;
pub mod sink;
pub mod view;

pub use body::ResponseBody;
pub use encoding::ContentEncoding;
pub use error::ServeError;
pub use gateway::Gateway;
pub use output::{ChannelOutput, OutputError, ResponseOutput};
pub use render::Renderer;
pub use router::Route;
pub use service::{GatewayService, dispatch};
pub use sink::StreamSink;
