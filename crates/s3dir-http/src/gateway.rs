//! Request handling.
//!
//! [`Gateway`] turns one request into one response written to a
//! [`ResponseOutput`]. It owns no per-request state: the store and renderer are
//! shared read-only, so a single instance serves every connection.
//!
//! Failures of backend calls made before any output exists become an error page
//! (HTTP 500). Archive failures go through [`StreamSink::abort`], which either
//! hands the output back for an error page or truncates the transfer.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::request::Parts;
use http::{HeaderValue, StatusCode};
use s3dir_core::path::segment_prefix;
use s3dir_core::{ErrorDetail, ListingWalker, ObjectStore, SortSelection, sort_objects};
use tracing::{debug, info, warn};

use crate::archive::{archive_filename, write_archive};
use crate::encoding::ContentEncoding;
use crate::error::ServeError;
use crate::headers::{SORT_COOKIE, content_disposition, content_disposition_header, read_cookie, sort_cookie};
use crate::output::{ResponseHead, ResponseOutput};
use crate::render::Renderer;
use crate::router::{Query, Route};
use crate::sink::{STREAM_BUFFER_CAPACITY, StreamSink};
use crate::view::{BucketsView, ErrorView, ObjectView, ObjectsView};

/// Body of the health endpoint.
pub const HEALTH_BODY: &str = r#"{"status":"running","service":"s3dir"}"#;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Listing delimiter.
const DELIMITER: &str = "/";

fn status_head(status: StatusCode) -> ResponseHead {
    let mut head = ResponseHead::new(());
    *head.status_mut() = status;
    head
}

fn full_path(bucket: &str, segments: &[String]) -> Vec<String> {
    std::iter::once(bucket.to_owned())
        .chain(segments.iter().cloned())
        .collect()
}

/// The s3dir request handler.
#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn ObjectStore>,
    renderer: Arc<Renderer>,
    buffer_capacity: usize,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("renderer", &self.renderer)
            .field("buffer_capacity", &self.buffer_capacity)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Create a gateway over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, renderer: Renderer) -> Self {
        Self {
            store,
            renderer: Arc::new(renderer),
            buffer_capacity: STREAM_BUFFER_CAPACITY,
        }
    }

    /// Set the number of bytes buffered before a response streams.
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Serve one request, writing the response to `output`.
    ///
    /// Never fails: every error is either turned into a response or, when the
    /// client is gone or the response already started, logged.
    pub async fn serve<O: ResponseOutput>(&self, request: &Parts, output: &mut O) {
        let query = Query::parse(request.uri.query());
        let route = Route::resolve(&request.method, &request.uri, &query);
        let encoding = ContentEncoding::from_headers(&request.headers);
        debug!(method = %request.method, uri = %request.uri, ?route, "routing request");

        let (path, result) = match route {
            Route::Health => (vec![], Self::health(output).await),
            Route::Favicon => (vec![], Self::empty(output, StatusCode::NOT_FOUND)),
            Route::MethodNotAllowed => (vec![], Self::method_not_allowed(output)),
            Route::AddTrailingSlash { location } => (
                vec![],
                Self::redirect(output, StatusCode::PERMANENT_REDIRECT, &location),
            ),
            Route::ListBuckets => (vec![], self.list_buckets(output, encoding).await),
            Route::ListObjects { bucket, segments } => {
                let cookie = read_cookie(&request.headers, SORT_COOKIE);
                let selection = SortSelection::resolve(query.get("sort"), cookie);
                let result = self
                    .list_objects(output, encoding, &bucket, &segments, selection)
                    .await;
                (full_path(&bucket, &segments), result)
            }
            Route::Archive { bucket, segments } => {
                let result = self.archive(output, encoding, &bucket, &segments).await;
                (full_path(&bucket, &segments), result)
            }
            Route::Object { bucket, segments } => {
                let result = self.object(output, encoding, &bucket, &segments).await;
                (full_path(&bucket, &segments), result)
            }
            Route::Location { bucket, segments } => {
                let result = self.location(output, &bucket, &segments).await;
                (full_path(&bucket, &segments), result)
            }
        };

        let Err(err) = result else {
            return;
        };
        if err.is_disconnect() {
            debug!(error = %err, "client gone, response not delivered");
            return;
        }

        warn!(error = %err, code = err.error_code(), "request failed");
        if let Err(cause) = self.render_error(output, encoding, &path, &err).await {
            debug!(error = %cause, "error page not delivered");
        }
    }

    async fn health<O: ResponseOutput>(output: &mut O) -> Result<(), ServeError> {
        let mut head = status_head(StatusCode::OK);
        head.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        head.headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(HEALTH_BODY.len()));
        output.write_head(head)?;
        output.write(Bytes::from_static(HEALTH_BODY.as_bytes())).await?;
        Ok(())
    }

    fn empty<O: ResponseOutput>(output: &mut O, status: StatusCode) -> Result<(), ServeError> {
        let mut head = status_head(status);
        head.headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        output.write_empty(head)?;
        Ok(())
    }

    fn method_not_allowed<O: ResponseOutput>(output: &mut O) -> Result<(), ServeError> {
        let mut head = status_head(StatusCode::METHOD_NOT_ALLOWED);
        head.headers_mut()
            .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
        head.headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        output.write_empty(head)?;
        Ok(())
    }

    fn redirect<O: ResponseOutput>(
        output: &mut O,
        status: StatusCode,
        location: &str,
    ) -> Result<(), ServeError> {
        let mut head = status_head(status);
        head.headers_mut()
            .insert(LOCATION, HeaderValue::from_str(location)?);
        head.headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        output.write_empty(head)?;
        Ok(())
    }

    /// Write an HTML page through a buffering sink.
    async fn page<O: ResponseOutput>(
        &self,
        output: &mut O,
        encoding: Option<ContentEncoding>,
        status: StatusCode,
        html: String,
        cookie: Option<HeaderValue>,
    ) -> Result<(), ServeError> {
        let mut sink = StreamSink::new(output, move |head| {
            *head.status_mut() = status;
            head.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE));
            if let Some(cookie) = cookie {
                head.headers_mut().insert(SET_COOKIE, cookie);
            }
        })
        .with_capacity(self.buffer_capacity)
        .with_encoding(encoding);

        sink.write(html.into()).await?;
        sink.complete().await?;
        Ok(())
    }

    async fn render_error<O: ResponseOutput>(
        &self,
        output: &mut O,
        encoding: Option<ContentEncoding>,
        path: &[String],
        err: &ServeError,
    ) -> Result<(), ServeError> {
        let view = ErrorView::new(path, err.error_code(), err.error_message());
        let html = self.renderer.error(&view).unwrap_or_else(|render_err| {
            warn!(error = %render_err, "error page failed to render");
            format!("{}: {}", view.code, view.message)
        });
        self.page(output, encoding, StatusCode::INTERNAL_SERVER_ERROR, html, None)
            .await
    }

    async fn list_buckets<O: ResponseOutput>(
        &self,
        output: &mut O,
        encoding: Option<ContentEncoding>,
    ) -> Result<(), ServeError> {
        let buckets = self
            .store
            .list_buckets()
            .await
            .map_err(|e| ServeError::store("list buckets", e))?;
        debug!(buckets = buckets.len(), "listed buckets");

        let html = self.renderer.buckets(&BucketsView::new(&buckets))?;
        self.page(output, encoding, StatusCode::OK, html, None).await
    }

    async fn list_objects<O: ResponseOutput>(
        &self,
        output: &mut O,
        encoding: Option<ContentEncoding>,
        bucket: &str,
        segments: &[String],
        selection: SortSelection,
    ) -> Result<(), ServeError> {
        let prefix = segment_prefix(segments);
        let mut listing = ListingWalker::new(self.store.as_ref(), bucket, &prefix, Some(DELIMITER))
            .collect()
            .await?;
        sort_objects(&mut listing.objects, selection.option);
        debug!(
            bucket,
            prefix = %prefix,
            objects = listing.objects.len(),
            prefixes = listing.prefixes.len(),
            sort = %selection.option,
            "listed objects"
        );

        let view = ObjectsView::new(bucket, segments, &listing, selection.option);
        let html = self.renderer.objects(&view)?;
        let cookie = selection.persist.then(|| sort_cookie(selection.option));
        self.page(output, encoding, StatusCode::OK, html, cookie)
            .await
    }

    async fn object<O: ResponseOutput>(
        &self,
        output: &mut O,
        encoding: Option<ContentEncoding>,
        bucket: &str,
        segments: &[String],
    ) -> Result<(), ServeError> {
        let key = segments.join("/");
        let metadata = self
            .store
            .head_object(bucket, &key)
            .await
            .map_err(|e| ServeError::store(format!("head s3://{bucket}/{key}"), e))?;

        let html = self
            .renderer
            .object(&ObjectView::new(bucket, segments, metadata))?;
        self.page(output, encoding, StatusCode::OK, html, None).await
    }

    async fn location<O: ResponseOutput>(
        &self,
        output: &mut O,
        bucket: &str,
        segments: &[String],
    ) -> Result<(), ServeError> {
        let key = segments.join("/");
        let name = segments.last().map_or(key.as_str(), String::as_str);
        let disposition = content_disposition("inline", name);
        let url = self
            .store
            .presign_get(bucket, &key, Some(&disposition))
            .await
            .map_err(|e| ServeError::store(format!("sign s3://{bucket}/{key}"), e))?;

        debug!(bucket, key = %key, "redirecting to signed URL");
        Self::redirect(output, StatusCode::TEMPORARY_REDIRECT, &url)
    }

    async fn archive<O: ResponseOutput>(
        &self,
        output: &mut O,
        encoding: Option<ContentEncoding>,
        bucket: &str,
        segments: &[String],
    ) -> Result<(), ServeError> {
        let filename = archive_filename(bucket, segments);
        let disposition = content_disposition_header("attachment", &filename)?;
        info!(bucket, filename = %filename, "building archive");

        let mut sink = StreamSink::new(output, move |head| {
            *head.status_mut() = StatusCode::OK;
            head.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/zip"));
            head.headers_mut().insert(CONTENT_DISPOSITION, disposition);
        })
        .with_capacity(self.buffer_capacity);

        let err = match write_archive(self.store.as_ref(), bucket, segments, &mut sink).await {
            Ok(_) => return Ok(()),
            Err(err @ ServeError::Output(_)) => return Err(err),
            Err(err) => err,
        };

        warn!(bucket, filename = %filename, error = %err, "archive failed");
        match sink.abort().await {
            Some(output) => {
                self.render_error(output, encoding, &full_path(bucket, segments), &err)
                    .await
            }
            None => {
                warn!(bucket, filename = %filename, "archive truncated after streaming started");
                Ok(())
            }
        }
    }
}
