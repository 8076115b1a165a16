//! HTTP response building module
//!
//! Provides builders for the fixed-status responses the server produces,
//! decoupled from specific business logic.

use super::cache::{CachePolicy, Validators};
use super::{empty, full, ResponseBody};
use hyper::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, LAST_MODIFIED,
};
use hyper::http::response::Builder;
use hyper::{Response, StatusCode};

/// Build 304 Not Modified response
pub fn build_304_response(validators: &Validators, policy: CachePolicy) -> Response<ResponseBody> {
    with_validators(Response::builder().status(StatusCode::NOT_MODIFIED), validators)
        .header(CACHE_CONTROL, policy.to_header_value())
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(empty())
        })
}

/// Build 400 Bad Request response
pub fn build_400_response() -> Response<ResponseBody> {
    text_response(StatusCode::BAD_REQUEST, "400 Bad Request")
}

/// Build 404 Not Found response with the configured body
pub fn build_404_response(body: &str) -> Response<ResponseBody> {
    text_response(StatusCode::NOT_FOUND, body)
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<ResponseBody> {
    text_response(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large")
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: u64) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_RANGE, format!("bytes */{file_size}"))
        .body(full("Range Not Satisfiable"))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(empty())
        })
}

/// Build 502 Bad Gateway response. Carries no body: nothing from a failed
/// upstream exchange is passed on.
pub fn build_502_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::BAD_GATEWAY)
        .header(CONTENT_LENGTH, 0)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error("502", &e);
            Response::new(empty())
        })
}

/// Start a 200/206 file response with type, length and cache headers.
/// The caller supplies the body.
pub fn file_response_builder(
    status: StatusCode,
    content_type: &str,
    content_length: u64,
    validators: &Validators,
    policy: CachePolicy,
) -> Builder {
    with_validators(Response::builder().status(status), validators)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(ACCEPT_RANGES, "bytes")
        .header(CACHE_CONTROL, policy.to_header_value())
}

/// Finish a builder, logging and degrading to an empty 500 on failure
pub fn finish(builder: Builder, body: ResponseBody, status: &str) -> Response<ResponseBody> {
    builder.body(body).unwrap_or_else(|e| {
        log_build_error(status, &e);
        let mut response = Response::new(empty());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

fn with_validators(builder: Builder, validators: &Validators) -> Builder {
    let builder = builder.header(ETAG, validators.etag.as_str());
    match validators.last_modified_header() {
        Some(last_modified) => builder.header(LAST_MODIFIED, last_modified),
        None => builder,
    }
}

fn text_response(status: StatusCode, body: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, body.len())
        .body(full(body.to_owned()))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(full(body.to_owned()))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    tracing::error!("Failed to build {status} response: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_string(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_404_carries_configured_body() {
        let response = build_404_response("File Not Found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_LENGTH], "14");
        assert_eq!(body_string(response).await, "File Not Found");
    }

    #[tokio::test]
    async fn test_502_has_no_body() {
        let response = build_502_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_string(response).await, "");
    }

    #[test]
    fn test_304_has_validators() {
        let validators = Validators::new(5, None);
        let response = build_304_response(&validators, CachePolicy::Public(60));
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()[ETAG], validators.etag.as_str());
        assert_eq!(response.headers()[CACHE_CONTROL], "public, max-age=60");
        assert!(response.headers().get(LAST_MODIFIED).is_none());
    }

    #[test]
    fn test_416_reports_size() {
        let response = build_416_response(1234);
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[CONTENT_RANGE], "bytes */1234");
    }
}
