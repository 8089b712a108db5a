//! s3dir server: browse S3 buckets, download prefixes as zip archives.
//!
//! # Usage
//!
//! ```text
//! ENDPOINT=http://localhost:9000 LISTEN_ADDR=0.0.0.0:9001 s3dir-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LISTEN_ADDR` | `127.0.0.1:9001` | Bind address |
//! | `ENDPOINT` | *(unset)* | S3-compatible endpoint; unset uses AWS |
//! | `SIGNING_REGION` | `us-west-2` | Region used with a custom endpoint |
//! | `FORCE_PATH_STYLE` | `true` | Path-style addressing on a custom endpoint |
//! | `PRESIGN_EXPIRY_SECS` | `900` | Lifetime of signed URLs |
//! | `STREAM_BUFFER_CAPACITY` | `16777216` | Bytes buffered before streaming |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//!
//! Configuration is read from the environment only; there are no command-line
//! flags besides `--health-check`. Credentials come from the standard AWS
//! provider chain.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use s3dir_aws::AwsObjectStore;
use s3dir_core::GatewayConfig;
use s3dir_http::router::HEALTH_PATH;
use s3dir_http::{Gateway, GatewayService, Renderer};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

async fn build_gateway(config: &GatewayConfig) -> Gateway {
    let store = AwsObjectStore::from_config(config).await;
    Gateway::new(Arc::new(store), Renderer::default())
        .with_buffer_capacity(config.stream_buffer_capacity)
}

/// Serve connections until ctrl-c, then drain in-flight requests.
async fn serve(listener: TcpListener, service: GatewayService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let conn = http.serve_connection(TokioIo::new(stream), service.clone());
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => break,
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Address to probe for `--health-check`; wildcard binds are probed on loopback.
fn probe_addr(listen_addr: &str) -> String {
    listen_addr
        .replace("0.0.0.0", "127.0.0.1")
        .replace("[::]", "[::1]")
}

/// Request the health endpoint; succeeds only on a `200 OK`.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request =
        format!("GET {HEALTH_PATH} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.starts_with("HTTP/1.1 200") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env();

    // Docker HEALTHCHECK entry point.
    if std::env::args().any(|a| a == "--health-check") {
        let healthy = run_health_check(&probe_addr(&config.listen_addr))
            .await
            .is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    info!(
        listen_addr = %config.listen_addr,
        endpoint = config.endpoint.as_deref().unwrap_or("aws"),
        presign_expiry_secs = config.presign_expiry_secs,
        stream_buffer_capacity = config.stream_buffer_capacity,
        version = VERSION,
        "starting s3dir",
    );

    let service = GatewayService::new(build_gateway(&config).await);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen_addr))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_probe_loopback_for_wildcard_binds() {
        assert_eq!(probe_addr("0.0.0.0:9001"), "127.0.0.1:9001");
        assert_eq!(probe_addr("[::]:9001"), "[::1]:9001");
        assert_eq!(probe_addr("10.0.0.5:80"), "10.0.0.5:80");
    }

    #[tokio::test]
    async fn test_should_fail_health_check_without_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        drop(listener);
        assert!(run_health_check(&addr).await.is_err());
    }
}
