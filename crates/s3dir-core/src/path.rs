//! Request path handling.
//!
//! Paths are handled as sequences of non-empty segments. The gateway addresses
//! `/{bucket}/{key segments...}`, and object keys are re-keyed by stripping a
//! number of leading segments, so both sides go through [`trim_path_segments`].

/// Split a slash-delimited path into its non-empty segments.
///
/// Leading, trailing, and repeated slashes never produce empty segments, so
/// `"/" + segments.join("/")` is the canonical form of `path`.
///
/// # Examples
///
/// ```
/// use s3dir_core::path::trim_path_segments;
///
/// assert_eq!(trim_path_segments("//photos///2024/"), vec!["photos", "2024"]);
/// assert!(trim_path_segments("/").is_empty());
/// ```
#[must_use]
pub fn trim_path_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Build the listing prefix for a sequence of segments.
///
/// Every segment is followed by a slash, so the prefix only matches keys inside
/// the addressed "directory". An empty sequence yields an empty prefix.
#[must_use]
pub fn segment_prefix(segments: &[String]) -> String {
    let mut prefix = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum());
    for segment in segments {
        prefix.push_str(segment);
        prefix.push('/');
    }
    prefix
}

/// Return the final path component of an object key.
///
/// Trailing slashes are ignored, so the base name of `"a/b/"` is `"b"`.
#[must_use]
pub fn base_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Derive the entry name of `key` relative to a root of `depth` segments.
///
/// Returns `None` when nothing remains after stripping the root, which is the
/// case for directory marker objects such as `"a/"` under the root `a`.
#[must_use]
pub fn relative_name(key: &str, depth: usize) -> Option<String> {
    let segments = trim_path_segments(key);
    if segments.len() <= depth {
        return None;
    }
    Some(segments[depth..].join("/"))
}
