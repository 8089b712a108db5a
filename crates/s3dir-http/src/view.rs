//! View models for the HTML pages.
//!
//! Everything a template displays is computed here (links, labels, human readable
//! sizes and times) so the templates stay free of logic.

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use s3dir_core::path::{base_name, segment_prefix, trim_path_segments};
use s3dir_core::{BucketRecord, Listing, ObjectMetadata, SortOption};

const BYTE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Characters left as-is in a path segment of a generated link.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Format a byte count with two decimals in base 1024 units.
///
/// ```
/// use s3dir_http::view::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 Bytes");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_owned();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", BYTE_UNITS[unit])
}

/// Format a timestamp in the classic C `asctime` layout (`Mon Jan  2 15:04:05 2006`).
#[must_use]
pub fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%a %b %e %H:%M:%S %Y").to_string()
}

fn format_optional_time(at: Option<&DateTime<Utc>>) -> String {
    at.map(format_time).unwrap_or_default()
}

/// Build a link to `/{segments...}`, percent-encoding every segment.
#[must_use]
pub fn segments_href<S: AsRef<str>>(segments: &[S], trailing_slash: bool) -> String {
    let mut href = String::new();
    for segment in segments {
        href.push('/');
        href.extend(utf8_percent_encode(segment.as_ref(), PATH_SEGMENT));
    }
    if trailing_slash || href.is_empty() {
        href.push('/');
    }
    href
}

/// One element of the breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    /// Displayed segment.
    pub name: String,
    /// Link target.
    pub href: String,
}

/// Breadcrumbs for a path of `[bucket, segments...]`.
///
/// Every crumb links to the listing of its prefix, except the last one of an
/// object page, which links to the object itself.
#[must_use]
pub fn breadcrumbs(path: &[String], object: bool) -> Vec<Crumb> {
    (0..path.len())
        .map(|i| {
            let is_object = object && i + 1 == path.len();
            Crumb {
                name: path[i].clone(),
                href: segments_href(&path[..=i], !is_object),
            }
        })
        .collect()
}

fn full_path(bucket: &str, segments: &[String]) -> Vec<String> {
    std::iter::once(bucket.to_owned())
        .chain(segments.iter().cloned())
        .collect()
}

/// A bucket row.
#[derive(Debug, Clone)]
pub struct BucketRow {
    /// Bucket name.
    pub name: String,
    /// Link to the bucket listing.
    pub href: String,
    /// Formatted creation date, or empty.
    pub created: String,
}

/// Model of the bucket listing page.
#[derive(Debug, Clone)]
pub struct BucketsView {
    /// Visible buckets.
    pub buckets: Vec<BucketRow>,
}

impl BucketsView {
    /// Build the view from the backend bucket list.
    #[must_use]
    pub fn new(buckets: &[BucketRecord]) -> Self {
        Self {
            buckets: buckets
                .iter()
                .map(|bucket| BucketRow {
                    name: bucket.name.clone(),
                    href: segments_href(&[bucket.name.as_str()], true),
                    created: format_optional_time(bucket.creation_date.as_ref()),
                })
                .collect(),
        }
    }
}

/// A sub-directory row of a listing.
#[derive(Debug, Clone)]
pub struct PrefixRow {
    /// Name relative to the listed prefix, with a trailing slash.
    pub name: String,
    /// Link to the sub-listing.
    pub href: String,
}

/// An object row of a listing.
#[derive(Debug, Clone)]
pub struct ObjectRow {
    /// Name relative to the listed prefix.
    pub name: String,
    /// Link to the object detail page.
    pub href: String,
    /// Link redirecting to the object content.
    pub download_href: String,
    /// Human readable size.
    pub size: String,
    /// Formatted last modification time, or empty.
    pub last_modified: String,
}

/// An entry of the sort selector.
#[derive(Debug, Clone)]
pub struct SortChoice {
    /// Query value.
    pub value: &'static str,
    /// Display label.
    pub label: &'static str,
    /// Whether this is the active sort.
    pub selected: bool,
}

/// Model of an object listing page.
#[derive(Debug, Clone)]
pub struct ObjectsView {
    /// Breadcrumbs of `[bucket, segments...]`.
    pub crumbs: Vec<Crumb>,
    /// Sub-directories, in listing order.
    pub prefixes: Vec<PrefixRow>,
    /// Objects, in sorted order.
    pub objects: Vec<ObjectRow>,
    /// Sort selector entries.
    pub sort_choices: Vec<SortChoice>,
    /// Link downloading the listed prefix as a zip archive.
    pub archive_href: String,
}

impl ObjectsView {
    /// Build the view of an already sorted listing.
    #[must_use]
    pub fn new(bucket: &str, segments: &[String], listing: &Listing, sort: SortOption) -> Self {
        let path = full_path(bucket, segments);
        let prefix = segment_prefix(segments);

        let prefixes = listing
            .prefixes
            .iter()
            .map(|common| {
                let mut target = path[..1].to_vec();
                target.extend(trim_path_segments(common));
                PrefixRow {
                    name: common.strip_prefix(&prefix).unwrap_or(common).to_owned(),
                    href: segments_href(&target, true),
                }
            })
            .collect();

        let objects = listing
            .objects
            .iter()
            .map(|object| {
                let mut target = path[..1].to_vec();
                target.extend(trim_path_segments(&object.key));
                let href = segments_href(&target, false);
                ObjectRow {
                    name: object
                        .key
                        .strip_prefix(&prefix)
                        .unwrap_or(&object.key)
                        .to_owned(),
                    download_href: format!("{href}?location"),
                    href,
                    size: format_bytes(object.size),
                    last_modified: format_optional_time(object.last_modified.as_ref()),
                }
            })
            .collect();

        Self {
            crumbs: breadcrumbs(&path, false),
            prefixes,
            objects,
            sort_choices: SortOption::ALL
                .iter()
                .map(|option| SortChoice {
                    value: option.as_str(),
                    label: option.label(),
                    selected: *option == sort,
                })
                .collect(),
            archive_href: format!("{}?archive", segments_href(&path, true)),
        }
    }

    /// Whether the listed prefix is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.objects.is_empty()
    }
}

/// Model of the object detail page.
#[derive(Debug, Clone)]
pub struct ObjectView {
    /// Breadcrumbs of `[bucket, segments...]`.
    pub crumbs: Vec<Crumb>,
    /// Final key segment.
    pub name: String,
    /// Bucket name.
    pub bucket: String,
    /// Full object key.
    pub key: String,
    /// Human readable size.
    pub size: String,
    /// Exact size in bytes.
    pub size_bytes: u64,
    /// Stored content type, or empty.
    pub content_type: String,
    /// Entity tag, or empty.
    pub e_tag: String,
    /// Formatted last modification time, or empty.
    pub last_modified: String,
    /// Storage class, or empty.
    pub storage_class: String,
    /// User metadata sorted by key.
    pub metadata: Vec<(String, String)>,
    /// Link redirecting to the object content.
    pub download_href: String,
}

impl ObjectView {
    /// Build the view from a head response.
    #[must_use]
    pub fn new(bucket: &str, segments: &[String], metadata: ObjectMetadata) -> Self {
        let path = full_path(bucket, segments);
        let mut user_metadata: Vec<_> = metadata.metadata.into_iter().collect();
        user_metadata.sort();

        Self {
            crumbs: breadcrumbs(&path, true),
            name: segments
                .last()
                .map_or_else(|| bucket.to_owned(), |s| base_name(s).to_owned()),
            bucket: bucket.to_owned(),
            key: segments.join("/"),
            size: format_bytes(metadata.size),
            size_bytes: metadata.size,
            content_type: metadata.content_type.unwrap_or_default(),
            e_tag: metadata.e_tag.unwrap_or_default(),
            last_modified: format_optional_time(metadata.last_modified.as_ref()),
            storage_class: metadata.storage_class.unwrap_or_default(),
            metadata: user_metadata,
            download_href: format!("{}?location", segments_href(&path, false)),
        }
    }
}

/// Model of the error page.
#[derive(Debug, Clone)]
pub struct ErrorView {
    /// Breadcrumbs of the failed path, if any.
    pub crumbs: Vec<Crumb>,
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

impl ErrorView {
    /// Build the view for a failure while serving `path`.
    #[must_use]
    pub fn new(path: &[String], code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            crumbs: breadcrumbs(path, false),
            code: code.into(),
            message: message.into(),
        }
    }
}
