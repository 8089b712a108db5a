//! The storage capability consumed by the gateway.
//!
//! [`ObjectStore`] is the boundary between the gateway and a concrete backend.
//! It covers exactly what the gateway needs: bucket listing, one page of a
//! prefix listing, object metadata, signed URL issuance, and a raw read through
//! a signed URL.

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::StoreError;

/// Streamed object bytes returned by [`ObjectStore::fetch`].
pub type ObjectBody = Pin<Box<dyn Stream<Item = Result<Bytes, StoreError>> + Send>>;

/// A bucket returned by [`ObjectStore::list_buckets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRecord {
    /// Bucket name.
    pub name: String,
    /// Creation date, when the backend reports one.
    pub creation_date: Option<DateTime<Utc>>,
}

/// One object of a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Full object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time. Absence is a valid state and sorts as oldest.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Object metadata returned by [`ObjectStore::head_object`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Size in bytes.
    pub size: u64,
    /// `Content-Type` stored with the object.
    pub content_type: Option<String>,
    /// Entity tag.
    pub e_tag: Option<String>,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Storage class name.
    pub storage_class: Option<String>,
    /// User metadata (`x-amz-meta-*`).
    pub metadata: HashMap<String, String>,
}

/// Parameters of a single listing page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Bucket to list.
    pub bucket: String,
    /// Key prefix; empty lists the whole bucket.
    pub prefix: String,
    /// Delimiter used to fold keys into common prefixes. `None` lists recursively.
    pub delimiter: Option<String>,
    /// Token returned by the previous page.
    pub continuation_token: Option<String>,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Objects in backend order.
    pub objects: Vec<ObjectRecord>,
    /// Raw (possibly percent-encoded) common prefixes.
    pub common_prefixes: Vec<String>,
    /// Token for the next page; `None` when the listing is exhausted.
    pub next_continuation_token: Option<String>,
}

/// Storage backend capability.
///
/// Every call is a suspension point and none of them are retried by the
/// gateway; a failure is reported straight back to the request.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// List every bucket visible to the gateway.
    async fn list_buckets(&self) -> Result<Vec<BucketRecord>, StoreError>;

    /// Fetch one page of a prefix listing.
    async fn list_page(&self, request: &ListRequest) -> Result<ListPage, StoreError>;

    /// Retrieve the metadata of a single object.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, StoreError>;

    /// Issue a time-limited URL granting direct read access to one object.
    ///
    /// When `content_disposition` is set, the URL asks the backend to answer
    /// with that `Content-Disposition` header.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        content_disposition: Option<&str>,
    ) -> Result<String, StoreError>;

    /// Read the raw bytes behind a URL issued by [`ObjectStore::presign_get`].
    async fn fetch(&self, url: &str) -> Result<ObjectBody, StoreError>;
}

/// Default lifetime of a signed URL.
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(900);
