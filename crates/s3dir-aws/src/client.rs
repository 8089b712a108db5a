//! S3 client construction.

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use s3dir_core::GatewayConfig;
use tracing::info;

/// Build an S3 client from the gateway configuration.
///
/// Credentials and, without a custom endpoint, the region come from the
/// standard AWS provider chain. A custom endpoint is signed for
/// `signing_region` and optionally addressed path-style.
pub async fn build_client(config: &GatewayConfig) -> aws_sdk_s3::Client {
    let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let mut builder = aws_sdk_s3::config::Builder::from(&shared);

    if let Some(endpoint) = &config.endpoint {
        info!(
            endpoint = %endpoint,
            region = %config.signing_region,
            path_style = config.force_path_style,
            "using custom S3 endpoint"
        );
        builder = builder
            .endpoint_url(endpoint)
            .region(Region::new(config.signing_region.clone()))
            .force_path_style(config.force_path_style);
    }

    aws_sdk_s3::Client::from_conf(builder.build())
}
