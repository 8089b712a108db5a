//! Gateway configuration.
//!
//! Provides [`GatewayConfig`]. Values are loaded from environment variables with
//! defaults suitable for running next to a local S3-compatible endpoint.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::store::DEFAULT_PRESIGN_EXPIRY;

/// Default capacity of the response buffer (16 MiB).
pub const DEFAULT_STREAM_BUFFER_CAPACITY: usize = 16 * 1024 * 1024;

/// Gateway configuration.
///
/// # Examples
///
/// ```
/// use s3dir_core::config::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.listen_addr, "127.0.0.1:9001");
/// assert!(config.endpoint.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Bind address (e.g. `"127.0.0.1:9001"`).
    #[builder(default = String::from("127.0.0.1:9001"))]
    pub listen_addr: String,

    /// Custom S3 endpoint URL. `None` uses the AWS default endpoint resolution.
    #[builder(default)]
    pub endpoint: Option<String>,

    /// Signing region used together with a custom endpoint.
    #[builder(default = String::from("us-west-2"))]
    pub signing_region: String,

    /// Whether to address buckets path-style on a custom endpoint.
    #[builder(default = true)]
    pub force_path_style: bool,

    /// Lifetime of signed URLs, in seconds.
    #[builder(default = DEFAULT_PRESIGN_EXPIRY.as_secs())]
    pub presign_expiry_secs: u64,

    /// Bytes buffered before a response switches to chunked streaming.
    #[builder(default = DEFAULT_STREAM_BUFFER_CAPACITY)]
    pub stream_buffer_capacity: usize,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `LISTEN_ADDR` | `127.0.0.1:9001` |
    /// | `ENDPOINT` | *(unset)* |
    /// | `SIGNING_REGION` | `us-west-2` |
    /// | `FORCE_PATH_STYLE` | `true` |
    /// | `PRESIGN_EXPIRY_SECS` | `900` |
    /// | `STREAM_BUFFER_CAPACITY` | `16777216` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Some(v) = lookup("ENDPOINT").filter(|v| !v.is_empty()) {
            config.endpoint = Some(v);
        }
        if let Some(v) = lookup("SIGNING_REGION") {
            config.signing_region = v;
        }
        if let Some(v) = lookup("FORCE_PATH_STYLE") {
            config.force_path_style = parse_bool(&v);
        }
        if let Some(n) = lookup("PRESIGN_EXPIRY_SECS").and_then(|v| v.parse().ok()) {
            config.presign_expiry_secs = n;
        }
        if let Some(n) = lookup("STREAM_BUFFER_CAPACITY").and_then(|v| v.parse().ok()) {
            config.stream_buffer_capacity = n;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Lifetime of signed URLs.
    #[must_use]
    pub fn presign_expiry(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.presign_expiry_secs)
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr, "127.0.0.1:9001");
        assert!(config.endpoint.is_none());
        assert_eq!(config.signing_region, "us-west-2");
        assert!(config.force_path_style);
        assert_eq!(config.presign_expiry_secs, 900);
        assert_eq!(config.presign_expiry(), DEFAULT_PRESIGN_EXPIRY);
        assert_eq!(config.stream_buffer_capacity, 16_777_216);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_should_load_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LISTEN_ADDR", "0.0.0.0:8080"),
            ("ENDPOINT", "http://localhost:4566"),
            ("FORCE_PATH_STYLE", "false"),
            ("PRESIGN_EXPIRY_SECS", "60"),
            ("STREAM_BUFFER_CAPACITY", "not-a-number"),
        ]);
        let config = GatewayConfig::from_lookup(|name| env.get(name).map(|v| (*v).to_owned()));

        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:4566"));
        assert!(!config.force_path_style);
        assert_eq!(config.presign_expiry().as_secs(), 60);
        assert_eq!(config.stream_buffer_capacity, DEFAULT_STREAM_BUFFER_CAPACITY);
    }

    #[test]
    fn test_should_ignore_empty_endpoint() {
        let config = GatewayConfig::from_lookup(|name| (name == "ENDPOINT").then(String::new));
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_should_build_with_typed_builder() {
        let config = GatewayConfig::builder()
            .listen_addr("127.0.0.1:9999".into())
            .endpoint(Some("http://minio:9000".into()))
            .stream_buffer_capacity(1024)
            .build();

        assert_eq!(config.listen_addr, "127.0.0.1:9999");
        assert_eq!(config.endpoint.as_deref(), Some("http://minio:9000"));
        assert_eq!(config.stream_buffer_capacity, 1024);
    }

    #[test]
    fn test_should_serialize_to_camel_case_json() {
        let config = GatewayConfig::default();
        let json = serde_json::to_string(&config).expect("test serialization");
        assert!(json.contains("listenAddr"));
        assert!(json.contains("streamBufferCapacity"));
    }

    #[test]
    fn test_should_parse_bool_values() {
        assert!(parse_bool("1"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
    }
}
