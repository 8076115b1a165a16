//! Upstream transport.
//!
//! The relay talks to its target through [`Upstream`], so the pooled
//! production client can be swapped for a fake in tests.

use super::RelayError;
use crate::http::{BoxError, RequestBody, ResponseBody};
use async_trait::async_trait;
use futures::TryStreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Body, Frame};
use hyper::header::{HeaderValue, CONTENT_LENGTH};
use hyper::{Request, Response};
use std::time::Duration;
use tracing::info;

/// One request/response exchange with the target
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Send `request` (absolute URI) and return the upstream response with a
    /// streaming body. Only transport failures are errors; any HTTP status
    /// is a successful exchange.
    async fn send(&self, request: Request<RequestBody>)
        -> Result<Response<ResponseBody>, RelayError>;
}

/// Pooled `reqwest` client. Honors `HTTP_PROXY`, `HTTPS_PROXY` and
/// `NO_PROXY` from the environment for its own egress.
#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    client: reqwest::Client,
}

impl ReqwestUpstream {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        info!(
            "Upstream client configured: timeout={}s, environment proxies honored",
            timeout.as_secs()
        );
        Ok(Self { client })
    }

    /// Wrap an already-configured client
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Upstream for ReqwestUpstream {
    async fn send(
        &self,
        request: Request<RequestBody>,
    ) -> Result<Response<ResponseBody>, RelayError> {
        let (mut parts, body) = request.into_parts();
        let url = parts.uri.to_string();

        // a known length goes out as content-length, anything else is chunked
        let length = body.size_hint().exact();
        if let Some(len) = length.filter(|len| *len > 0) {
            parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        }

        let mut outbound = self.client.request(parts.method, url).headers(parts.headers);
        if length != Some(0) {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = outbound
            .send()
            .await
            .map_err(|e| RelayError::Transport(Box::new(e)))?;

        let status = upstream.status();
        let headers = upstream.headers().clone();
        let stream = upstream
            .bytes_stream()
            .map_ok(Frame::data)
            .map_err(|e| -> BoxError { Box::new(e) });

        let mut response = Response::new(StreamBody::new(stream).boxed_unsync());
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
