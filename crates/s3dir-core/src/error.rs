//! Error types for storage access.
//!
//! Two layers of errors live here:
//!
//! - [`StoreError`] is returned by every [`ObjectStore`](crate::store::ObjectStore)
//!   call. Backends that report structured failures (an error code plus message)
//!   use [`StoreError::Api`]; everything else is a transport failure.
//! - [`ListingError`] is a failed walk, carrying the bucket and prefix it was
//!   listing so the error page can point at the right place.
//!
//! The [`ErrorDetail`] trait is how the error page extracts a code and message
//! from any error without knowing its concrete type.

/// Code shown when an error carries no structured backend code.
pub const GENERIC_ERROR_CODE: &str = "Error";

/// Structured detail extracted from an error for display.
pub trait ErrorDetail {
    /// Short machine-readable code such as `NoSuchBucket`.
    fn error_code(&self) -> &str;

    /// Human readable message.
    fn error_message(&self) -> String;
}

/// Error returned by a storage backend call.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend answered with a structured error.
    #[error("{code}: {message}")]
    Api {
        /// Backend error code (e.g. `NoSuchBucket`, `AccessDenied`).
        code: String,
        /// Backend error message.
        message: String,
    },

    /// The request could not be completed (network, signing, decoding).
    #[error("{0}")]
    Transport(String),

    /// The object body stream failed mid-transfer.
    #[error("transfer failed: {0}")]
    Transfer(#[from] std::io::Error),
}

impl StoreError {
    /// Build a structured API error.
    #[must_use]
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a transport error from anything displayable.
    #[must_use]
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

impl ErrorDetail for StoreError {
    fn error_code(&self) -> &str {
        match self {
            Self::Api { code, .. } => code,
            Self::Transport(_) | Self::Transfer(_) => GENERIC_ERROR_CODE,
        }
    }

    fn error_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// A listing walk that failed part way through.
#[derive(Debug, thiserror::Error)]
#[error("failed to list s3://{bucket}/{prefix}: {source}")]
pub struct ListingError {
    /// Bucket being listed.
    pub bucket: String,
    /// Key prefix being listed.
    pub prefix: String,
    /// The page request that failed.
    #[source]
    pub source: StoreError,
}

impl ErrorDetail for ListingError {
    fn error_code(&self) -> &str {
        self.source.error_code()
    }

    fn error_message(&self) -> String {
        self.source.error_message()
    }
}
