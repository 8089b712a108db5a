//! Conversions from SDK types to the gateway's records.

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::operation::head_object::HeadObjectOutput;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::primitives::DateTime as SdkDateTime;
use aws_sdk_s3::types::Bucket;
use chrono::{DateTime, Utc};
use s3dir_core::{BucketRecord, ListPage, ObjectMetadata, ObjectRecord, StoreError};

pub(crate) fn timestamp(at: Option<&SdkDateTime>) -> Option<DateTime<Utc>> {
    at.and_then(|at| DateTime::from_timestamp(at.secs(), at.subsec_nanos()))
}

fn size(value: Option<i64>) -> u64 {
    value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}

/// Map an SDK failure to a [`StoreError`], keeping the service's code and
/// message when the response carried them.
pub(crate) fn store_error<E>(err: E) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match err.code() {
        Some(code) => StoreError::api(code, err.message().unwrap_or(code)),
        None => StoreError::transport(DisplayErrorContext(&err)),
    }
}

pub(crate) fn bucket_record(bucket: &Bucket) -> Option<BucketRecord> {
    Some(BucketRecord {
        name: bucket.name()?.to_owned(),
        creation_date: timestamp(bucket.creation_date()),
    })
}

pub(crate) fn list_page(output: &ListObjectsV2Output) -> ListPage {
    let objects = output
        .contents()
        .iter()
        .filter_map(|object| {
            Some(ObjectRecord {
                key: object.key()?.to_owned(),
                size: size(object.size()),
                last_modified: timestamp(object.last_modified()),
            })
        })
        .collect();

    let common_prefixes = output
        .common_prefixes()
        .iter()
        .filter_map(|prefix| prefix.prefix().map(ToOwned::to_owned))
        .collect();

    let next_continuation_token = if output.is_truncated() == Some(true) {
        output.next_continuation_token().map(ToOwned::to_owned)
    } else {
        None
    };

    ListPage {
        objects,
        common_prefixes,
        next_continuation_token,
    }
}

pub(crate) fn object_metadata(output: HeadObjectOutput) -> ObjectMetadata {
    ObjectMetadata {
        size: size(output.content_length()),
        content_type: output.content_type().map(ToOwned::to_owned),
        e_tag: output.e_tag().map(ToOwned::to_owned),
        last_modified: timestamp(output.last_modified()),
        storage_class: output.storage_class().map(|class| class.as_str().to_owned()),
        metadata: output.metadata().cloned().unwrap_or_default(),
    }
}
