//! [`ObjectStore`] over `aws-sdk-s3`.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use bytes::Bytes;
use s3dir_core::{
    BucketRecord, GatewayConfig, ListPage, ListRequest, ObjectBody, ObjectMetadata, ObjectStore,
    StoreError,
};
use tracing::debug;

use crate::client::build_client;
use crate::convert::{bucket_record, list_page, object_metadata, store_error};

/// S3 backed object store.
#[derive(Debug, Clone)]
pub struct AwsObjectStore {
    client: aws_sdk_s3::Client,
    http: reqwest::Client,
    presign_expiry: Duration,
}

impl AwsObjectStore {
    /// Wrap an existing client.
    #[must_use]
    pub fn new(client: aws_sdk_s3::Client, presign_expiry: Duration) -> Self {
        Self {
            client,
            http: reqwest::Client::new(),
            presign_expiry,
        }
    }

    /// Build a store from the gateway configuration.
    pub async fn from_config(config: &GatewayConfig) -> Self {
        Self::new(build_client(config).await, config.presign_expiry())
    }
}

#[async_trait]
impl ObjectStore for AwsObjectStore {
    async fn list_buckets(&self) -> Result<Vec<BucketRecord>, StoreError> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(store_error)?;
        Ok(output.buckets().iter().filter_map(bucket_record).collect())
    }

    async fn list_page(&self, request: &ListRequest) -> Result<ListPage, StoreError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&request.bucket)
            .prefix(&request.prefix)
            .set_delimiter(request.delimiter.clone())
            .set_continuation_token(request.continuation_token.clone())
            .send()
            .await
            .map_err(store_error)?;
        Ok(list_page(&output))
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, StoreError> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(store_error)?;
        Ok(object_metadata(output))
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        content_disposition: Option<&str>,
    ) -> Result<String, StoreError> {
        let presigning = PresigningConfig::expires_in(self.presign_expiry)
            .map_err(StoreError::transport)?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_response_content_disposition(content_disposition.map(ToOwned::to_owned))
            .presigned(presigning)
            .await
            .map_err(store_error)?;
        Ok(request.uri().to_owned())
    }

    async fn fetch(&self, url: &str) -> Result<ObjectBody, StoreError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(StoreError::transport)?;
        debug!(
            status = %response.status(),
            length = ?response.content_length(),
            "fetching signed object"
        );

        let body = futures::stream::unfold(Some(response), |state| async move {
            let mut response = state?;
            match response.chunk().await {
                Ok(Some(chunk)) => Some((Ok::<Bytes, StoreError>(chunk), Some(response))),
                Ok(None) => None,
                Err(err) => Some((Err(StoreError::Transfer(std::io::Error::other(err))), None)),
            }
        });
        Ok(Box::pin(body))
    }
}
