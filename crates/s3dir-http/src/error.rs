//! Request-level errors.

use s3dir_core::error::GENERIC_ERROR_CODE;
use s3dir_core::{ErrorDetail, ListingError, StoreError};

use crate::output::OutputError;

/// Failure while serving one request.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// A listing walk failed.
    #[error(transparent)]
    Listing(#[from] ListingError),

    /// A single backend call failed.
    #[error("{context}: {source}")]
    Store {
        /// What was being attempted, e.g. `head s3://bucket/key`.
        context: String,
        /// Backend failure.
        #[source]
        source: StoreError,
    },

    /// The zip writer failed.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Local I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing to the client failed.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// A template failed to render.
    #[error("render error: {0}")]
    Render(#[from] askama::Error),

    /// A computed header value was not representable.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
}

impl ServeError {
    /// Wrap a backend failure with what was being attempted.
    #[must_use]
    pub fn store(context: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            context: context.into(),
            source,
        }
    }

    /// Whether the client is gone, so no response can be delivered at all.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Output(OutputError::Disconnected))
    }
}

impl ErrorDetail for ServeError {
    fn error_code(&self) -> &str {
        match self {
            Self::Listing(err) => err.error_code(),
            Self::Store { source, .. } => source.error_code(),
            _ => GENERIC_ERROR_CODE,
        }
    }

    fn error_message(&self) -> String {
        match self {
            Self::Listing(err) => err.error_message(),
            Self::Store { source, .. } => source.error_message(),
            other => other.to_string(),
        }
    }
}
