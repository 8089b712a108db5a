//! AWS SDK backed [`ObjectStore`](s3dir_core::ObjectStore) for the s3dir gateway.
//!
//! [`AwsObjectStore`] talks to S3 (or any S3-compatible endpoint) through
//! `aws-sdk-s3` and reads object bytes through signed URLs with `reqwest`, the
//! same way a browser following a signed link would.

mod client;
mod convert;
mod store;

pub use client::build_client;
pub use store::AwsObjectStore;
