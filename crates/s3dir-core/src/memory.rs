//! In-memory [`ObjectStore`] implementation.
//!
//! [`MemoryStore`] keeps buckets in sorted maps and answers listings the way S3
//! does: keys in lexicographic order, common prefixes counted against the page
//! size, and opaque base64 continuation tokens. Signed URLs use a `memory://`
//! scheme that [`MemoryStore::fetch`](ObjectStore::fetch) resolves back to the
//! stored bytes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::StoreError;
use crate::store::{
    BucketRecord, ListPage, ListRequest, ObjectBody, ObjectMetadata, ObjectRecord, ObjectStore,
};

/// Default number of entries per listing page, matching S3.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Size of the chunks yielded by [`ObjectStore::fetch`].
const FETCH_CHUNK_SIZE: usize = 64 * 1024;

const URL_SCHEME: &str = "memory://";

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Bytes,
    last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct MemoryBucket {
    created: Option<DateTime<Utc>>,
    objects: BTreeMap<String, MemoryObject>,
}

/// Position a continuation token resumes after.
#[derive(Debug, PartialEq, Eq)]
enum Marker {
    /// Resume after this object key.
    Key(String),
    /// Resume after every key under this common prefix.
    Prefix(String),
}

impl Marker {
    fn encode(&self) -> String {
        let raw = match self {
            Self::Key(key) => format!("k:{key}"),
            Self::Prefix(prefix) => format!("p:{prefix}"),
        };
        BASE64_STANDARD.encode(raw.as_bytes())
    }

    fn decode(token: &str) -> Result<Self, StoreError> {
        let invalid = || StoreError::api("InvalidArgument", "Invalid continuation token");
        let bytes = BASE64_STANDARD.decode(token).map_err(|_| invalid())?;
        let raw = String::from_utf8(bytes).map_err(|_| invalid())?;
        match raw.split_at_checked(2) {
            Some(("k:", key)) => Ok(Self::Key(key.to_owned())),
            Some(("p:", prefix)) => Ok(Self::Prefix(prefix.to_owned())),
            _ => Err(invalid()),
        }
    }

    fn covers(&self, key: &str) -> bool {
        match self {
            Self::Key(marker) => key <= marker.as_str(),
            Self::Prefix(prefix) => key <= prefix.as_str() || key.starts_with(prefix.as_str()),
        }
    }
}

/// Object store backed by process memory.
#[derive(Debug)]
pub struct MemoryStore {
    buckets: RwLock<BTreeMap<String, MemoryBucket>>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Limit listing pages to `page_size` entries (objects plus common prefixes).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Create a bucket; existing buckets are left untouched.
    pub fn create_bucket(&self, bucket: &str) {
        self.buckets
            .write()
            .entry(bucket.to_owned())
            .or_insert_with(|| MemoryBucket {
                created: Some(Utc::now()),
                objects: BTreeMap::new(),
            });
    }

    /// Store an object, creating the bucket when needed.
    pub fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        last_modified: Option<DateTime<Utc>>,
    ) {
        let mut buckets = self.buckets.write();
        let entry = buckets.entry(bucket.to_owned()).or_default();
        entry.objects.insert(
            key.to_owned(),
            MemoryObject {
                data: data.into(),
                last_modified,
            },
        );
    }

    /// Build the `memory://` URL for an object.
    fn object_url(bucket: &str, key: &str, content_disposition: Option<&str>) -> String {
        let mut url = format!(
            "{URL_SCHEME}{}/{}",
            utf8_percent_encode(bucket, NON_ALPHANUMERIC),
            utf8_percent_encode(key, NON_ALPHANUMERIC)
        );
        if let Some(disposition) = content_disposition {
            url.push_str("?response-content-disposition=");
            url.extend(utf8_percent_encode(disposition, NON_ALPHANUMERIC));
        }
        url
    }

    /// Resolve a `memory://` URL back to its bucket and key.
    fn parse_url(url: &str) -> Option<(String, String)> {
        let rest = url.strip_prefix(URL_SCHEME)?;
        let rest = rest.split_once('?').map_or(rest, |(path, _)| path);
        let (bucket, key) = rest.split_once('/')?;
        Some((
            percent_decode_str(bucket).decode_utf8().ok()?.into_owned(),
            percent_decode_str(key).decode_utf8().ok()?.into_owned(),
        ))
    }

    fn no_such_bucket(bucket: &str) -> StoreError {
        StoreError::api(
            "NoSuchBucket",
            format!("The specified bucket does not exist: {bucket}"),
        )
    }

    fn no_such_key(key: &str) -> StoreError {
        StoreError::api("NoSuchKey", format!("The specified key does not exist: {key}"))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<BucketRecord>, StoreError> {
        Ok(self
            .buckets
            .read()
            .iter()
            .map(|(name, bucket)| BucketRecord {
                name: name.clone(),
                creation_date: bucket.created,
            })
            .collect())
    }

    async fn list_page(&self, request: &ListRequest) -> Result<ListPage, StoreError> {
        let marker = request
            .continuation_token
            .as_deref()
            .map(Marker::decode)
            .transpose()?;

        let buckets = self.buckets.read();
        let bucket = buckets
            .get(&request.bucket)
            .ok_or_else(|| Self::no_such_bucket(&request.bucket))?;

        let prefix = request.prefix.as_str();
        let delimiter = request.delimiter.as_deref().filter(|d| !d.is_empty());

        let mut page = ListPage::default();
        let mut count = 0usize;
        let mut last: Option<Marker> = None;

        for (key, object) in &bucket.objects {
            if !key.starts_with(prefix) {
                continue;
            }
            if marker.as_ref().is_some_and(|m| m.covers(key)) {
                continue;
            }

            let folded = delimiter.and_then(|delim| {
                let after_prefix = &key[prefix.len()..];
                after_prefix
                    .find(delim)
                    .map(|pos| format!("{prefix}{}{delim}", &after_prefix[..pos]))
            });

            if let Some(common_prefix) = folded {
                if matches!(&last, Some(Marker::Prefix(p)) if *p == common_prefix) {
                    continue;
                }
                if count >= self.page_size {
                    page.next_continuation_token = last.as_ref().map(Marker::encode);
                    break;
                }
                page.common_prefixes.push(common_prefix.clone());
                last = Some(Marker::Prefix(common_prefix));
                count += 1;
                continue;
            }

            if count >= self.page_size {
                page.next_continuation_token = last.as_ref().map(Marker::encode);
                break;
            }
            page.objects.push(ObjectRecord {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: object.last_modified,
            });
            last = Some(Marker::Key(key.clone()));
            count += 1;
        }

        Ok(page)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, StoreError> {
        let buckets = self.buckets.read();
        let object = buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?
            .objects
            .get(key)
            .ok_or_else(|| Self::no_such_key(key))?;

        Ok(ObjectMetadata {
            size: object.data.len() as u64,
            content_type: Some("application/octet-stream".to_owned()),
            last_modified: object.last_modified,
            storage_class: Some("STANDARD".to_owned()),
            ..ObjectMetadata::default()
        })
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        content_disposition: Option<&str>,
    ) -> Result<String, StoreError> {
        if !self.buckets.read().contains_key(bucket) {
            return Err(Self::no_such_bucket(bucket));
        }
        Ok(Self::object_url(bucket, key, content_disposition))
    }

    async fn fetch(&self, url: &str) -> Result<ObjectBody, StoreError> {
        let (bucket, key) = Self::parse_url(url)
            .ok_or_else(|| StoreError::transport(format!("unsupported URL: {url}")))?;

        let data = self
            .buckets
            .read()
            .get(&bucket)
            .ok_or_else(|| Self::no_such_bucket(&bucket))?
            .objects
            .get(&key)
            .ok_or_else(|| Self::no_such_key(&key))?
            .data
            .clone();

        let chunks: Vec<Result<Bytes, StoreError>> = (0..data.len())
            .step_by(FETCH_CHUNK_SIZE)
            .map(|start| Ok(data.slice(start..(start + FETCH_CHUNK_SIZE).min(data.len()))))
            .collect();

        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}
