//! Storage-facing building blocks for the s3dir gateway.
//!
//! This crate holds everything the gateway needs that does not touch HTTP framing:
//!
//! - **Paths** ([`path`]): slash-delimited request paths as segment sequences.
//! - **Storage capability** ([`store`]): the [`ObjectStore`] trait consumed by the
//!   gateway, plus the record types it returns.
//! - **Listing walker** ([`walker`]): drives paginated listings to exhaustion.
//! - **Sort policy** ([`sort`]): orders listed objects and resolves the selected sort.
//! - **In-memory backend** ([`memory`]): an [`ObjectStore`] used for tests and local runs.
//! - **Configuration** ([`config`]): environment driven [`GatewayConfig`].
//!
//! # Architecture
//!
//! ```text
//! request path -> trim_path_segments -> (bucket, prefix)
//!        |
//!        v
//!   ListingWalker --(list_page, continuation token)--> ObjectStore
//!        |
//!        v
//!   Listing { objects, prefixes } -> sort_objects -> page
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod path;
pub mod sort;
pub mod store;
pub mod walker;

pub use config::GatewayConfig;
pub use error::{ErrorDetail, ListingError, StoreError};
pub use memory::MemoryStore;
pub use path::{segment_prefix, trim_path_segments};
pub use sort::{SortOption, SortSelection, sort_objects};
pub use store::{
    BucketRecord, ListPage, ListRequest, ObjectBody, ObjectMetadata, ObjectRecord, ObjectStore,
};
pub use walker::{Listing, ListingWalker};
