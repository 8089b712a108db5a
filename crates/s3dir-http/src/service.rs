//! The hyper service.
//!
//! [`GatewayService`] adapts the [`Gateway`] to hyper's `Service` trait. Each
//! request runs in its own task, instrumented with a span carrying the request
//! id. The task writes into a [`ChannelOutput`]; the service future resolves as
//! soon as the response head is committed and hyper then pulls the body from the
//! channel while the task keeps producing it.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue, SERVER};
use http::request::Parts;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{Instrument, debug, error, info_span};
use uuid::Uuid;

use crate::body::ResponseBody;
use crate::gateway::Gateway;
use crate::output::ChannelOutput;

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Value of the `Server` header.
pub const SERVER_NAME: &str = "s3dir";

/// hyper service serving the gateway.
#[derive(Debug, Clone)]
pub struct GatewayService {
    gateway: Arc<Gateway>,
}

impl GatewayService {
    /// Create a service around `gateway`.
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

impl Service<http::Request<Incoming>> for GatewayService {
    type Response = http::Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let gateway = Arc::clone(&self.gateway);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            // GET and HEAD carry no body worth reading.
            let (parts, _body) = req.into_parts();

            let response = dispatch(gateway, parts, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Run one request on its own task and wait for the response head.
///
/// The returned response's body keeps being fed by the task after this returns.
pub async fn dispatch(
    gateway: Arc<Gateway>,
    parts: Parts,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let (mut output, pending) = ChannelOutput::channel();
    let span = info_span!(
        "request",
        request_id,
        method = %parts.method,
        path = %parts.uri.path()
    );

    tokio::spawn(
        async move {
            gateway.serve(&parts, &mut output).await;
            debug!("request task finished");
        }
        .instrument(span),
    );

    match pending.await {
        Ok(response) => {
            debug!(request_id, status = %response.status(), "response head ready");
            response
        }
        Err(_) => {
            error!(request_id, "request task ended without a response");
            internal_error_response()
        }
    }
}

fn internal_error_response() -> http::Response<ResponseBody> {
    let body = "Internal Server Error";
    http::Response::builder()
        .status(http::StatusCode::INTERNAL_SERVER_ERROR)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, body.len())
        .body(ResponseBody::from_string(body))
        .unwrap_or_else(|_| http::Response::new(ResponseBody::empty()))
}

/// Add the headers every response carries.
fn add_common_headers(
    mut response: http::Response<ResponseBody>,
    request_id: &str,
) -> http::Response<ResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, hv);
    }
    headers.insert(SERVER, HeaderValue::from_static(SERVER_NAME));

    response
}
