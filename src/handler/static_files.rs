//! Static file serving module
//!
//! Resolves the request path, then streams the file with MIME type,
//! validators and Range support.

use crate::config::LocalMode;
use crate::handler::resolver;
use crate::handler::router::RequestContext;
use crate::http::cache::{CachePolicy, Validators};
use crate::http::{self, mime, response, ByteRange, RangeOutcome, ResponseBody};
use futures::TryStreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use hyper::{Response, StatusCode};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

/// Serve a request in local mode
pub async fn serve(
    ctx: &RequestContext<'_>,
    local: &LocalMode,
    not_found_body: &str,
    policy: CachePolicy,
) -> Response<ResponseBody> {
    debug!("Requested Path: {}", ctx.path);
    match resolver::resolve_request(local, ctx.path).await {
        Some(file) => serve_file(ctx, &file, not_found_body, policy).await,
        None => http::build_404_response(not_found_body),
    }
}

/// Serve one resolved file
pub async fn serve_file(
    ctx: &RequestContext<'_>,
    path: &Path,
    not_found_body: &str,
    policy: CachePolicy,
) -> Response<ResponseBody> {
    let mut file = match File::open(path).await {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to open file '{}': {e}", path.display());
            return http::build_404_response(not_found_body);
        }
    };
    let metadata = match file.metadata().await {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to stat file '{}': {e}", path.display());
            return http::build_404_response(not_found_body);
        }
    };

    let validators = Validators::from_metadata(&metadata);
    if validators.is_not_modified(ctx.if_none_match.as_deref(), ctx.if_modified_since.as_deref()) {
        return http::build_304_response(&validators, policy);
    }

    let total = metadata.len();
    let content_type = mime::content_type(path);

    let (status, range) = match http::parse_range_header(ctx.range_header.as_deref(), total) {
        RangeOutcome::Full => (StatusCode::OK, None),
        RangeOutcome::Partial(range) => (StatusCode::PARTIAL_CONTENT, Some(range)),
        RangeOutcome::Unsatisfiable => return http::build_416_response(total),
    };
    let length = range.map_or(total, |r| r.len());

    let mut builder =
        response::file_response_builder(status, &content_type, length, &validators, policy);
    if let Some(range) = range {
        builder = builder.header(hyper::header::CONTENT_RANGE, range.content_range(total));
    }

    if ctx.is_head {
        return response::finish(builder, http::empty(), status.as_str());
    }

    if let Some(ByteRange { start, .. }) = range {
        if let Err(e) = file.seek(SeekFrom::Start(start)).await {
            error!("Failed to seek '{}' to {start}: {e}", path.display());
            return http::build_416_response(total);
        }
    }

    response::finish(builder, file_body(file, length), status.as_str())
}

/// Stream `length` bytes from the current position of `file`
fn file_body(file: File, length: u64) -> ResponseBody {
    let stream = ReaderStream::new(file.take(length))
        .map_ok(Frame::data)
        .map_err(http::BoxError::from);
    StreamBody::new(stream).boxed_unsync()
}
