//! Request routing.
//!
//! Maps a method and URI onto a [`Route`]. Paths address
//! `/{bucket}/{key segments...}`; a trailing slash selects the listing of a
//! prefix, its absence a single object. Query flags (`archive`, `location`)
//! switch to the archive and redirect variants.

use http::{Method, Uri};
use percent_encoding::percent_decode_str;
use s3dir_core::trim_path_segments;

/// Path of the health endpoint.
pub const HEALTH_PATH: &str = "/_health";

/// Parsed query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Parse a raw (still encoded) query string.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        Self {
            pairs: raw
                .map(|raw| form_urlencoded::parse(raw.as_bytes()).into_owned().collect())
                .unwrap_or_default(),
        }
    }

    /// Whether the parameter appears at all, with or without a value.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.pairs.iter().any(|(key, _)| key == name)
    }

    /// Value of the first occurrence of the parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// What a request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET /_health`.
    Health,
    /// `GET /favicon.ico`, always `404`.
    Favicon,
    /// `GET /`.
    ListBuckets,
    /// `GET /{bucket}/{segments...}/`.
    ListObjects {
        /// Bucket name.
        bucket: String,
        /// Key segments of the listed prefix.
        segments: Vec<String>,
    },
    /// `GET /{bucket}/{segments...}/?archive`.
    Archive {
        /// Bucket name.
        bucket: String,
        /// Key segments of the archive root.
        segments: Vec<String>,
    },
    /// `GET /{bucket}/{segments...}`.
    Object {
        /// Bucket name.
        bucket: String,
        /// Key segments; never empty.
        segments: Vec<String>,
    },
    /// `GET /{bucket}/{segments...}?location`.
    Location {
        /// Bucket name.
        bucket: String,
        /// Key segments; never empty.
        segments: Vec<String>,
    },
    /// `GET /{bucket}`: redirect to the same path with a trailing slash.
    AddTrailingSlash {
        /// Redirect target.
        location: String,
    },
    /// Any method other than `GET` and `HEAD`.
    MethodNotAllowed,
}

impl Route {
    /// Resolve the route of a request.
    #[must_use]
    pub fn resolve(method: &Method, uri: &Uri, query: &Query) -> Self {
        if method != Method::GET && method != Method::HEAD {
            return Self::MethodNotAllowed;
        }

        let raw_path = uri.path();
        let path = percent_decode_str(raw_path).decode_utf8_lossy();
        match path.as_ref() {
            HEALTH_PATH => return Self::Health,
            "/favicon.ico" => return Self::Favicon,
            _ => {}
        }

        let mut segments = trim_path_segments(&path);
        if segments.is_empty() {
            return Self::ListBuckets;
        }
        let bucket = segments.remove(0);

        if path.ends_with('/') {
            if query.has("archive") {
                return Self::Archive { bucket, segments };
            }
            return Self::ListObjects { bucket, segments };
        }

        if segments.is_empty() {
            let location = match uri.query() {
                Some(raw_query) => format!("{raw_path}/?{raw_query}"),
                None => format!("{raw_path}/"),
            };
            return Self::AddTrailingSlash { location };
        }

        if query.has("location") {
            return Self::Location { bucket, segments };
        }
        Self::Object { bucket, segments }
    }
}
