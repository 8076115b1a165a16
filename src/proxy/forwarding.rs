//! Request forwarding logic for the proxy mode.
//!
//! Builds the outbound request from the inbound one, hands it to the
//! [`Upstream`] and relays status, headers and the streaming body back.

use super::client::Upstream;
use super::headers::{outbound_headers, replace_headers};
use super::RelayError;
use crate::config::ProxyMode;
use crate::http::{self, BoxError, RequestBody, ResponseBody};
use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_LENGTH};
use hyper::http::request::Parts;
use hyper::{Request, Response, StatusCode, Uri};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Remote relay: one target, one shared transport
pub struct Relay {
    mode: ProxyMode,
    upstream: Arc<dyn Upstream>,
}

impl Relay {
    pub fn new(mode: ProxyMode, upstream: Arc<dyn Upstream>) -> Self {
        info!("using proxy {}", mode.target);
        Self { mode, upstream }
    }

    /// Forward one inbound request.
    ///
    /// The client body streams straight through unless the index fallback is
    /// on, in which case it is buffered (capped) so it can be sent twice.
    /// `defaults` are the headers the server puts on every response; upstream
    /// headers replace them name by name.
    pub async fn forward<B>(&self, req: Request<B>, defaults: &HeaderMap) -> Response<ResponseBody>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_string();

        let Some(index) = self.mode.index_fallback.as_deref() else {
            let body: RequestBody = body.map_err(Into::into).boxed_unsync();
            let result = self.exchange(&parts, &path, body).await;
            return finish(&path, result, defaults);
        };

        let body = match self.read_body(&parts, body).await {
            Ok(body) => body,
            Err(RelayError::BodyTooLarge { limit }) => {
                warn!("request {path} rejected: body exceeds {limit} bytes");
                return with_defaults(http::build_413_response(), defaults);
            }
            Err(e) => {
                warn!("request {path} failed: {e}");
                return with_defaults(http::build_400_response(), defaults);
            }
        };

        let result = match self.exchange(&parts, &path, http::full(body.clone())).await {
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                Ok(self.index_fallback(&parts, &path, index, body, response).await)
            }
            other => other,
        };
        finish(&path, result, defaults)
    }

    /// Read the inbound body, capped at the configured size
    async fn read_body<B>(&self, parts: &Parts, body: B) -> Result<Bytes, RelayError>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        let limit = self.mode.max_body_size;
        let declared = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if declared.is_some_and(|len| len > limit) {
            return Err(RelayError::BodyTooLarge { limit });
        }

        let max = usize::try_from(limit).unwrap_or(usize::MAX);
        match Limited::new(body, max).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.is::<http_body_util::LengthLimitError>() => {
                Err(RelayError::BodyTooLarge { limit })
            }
            Err(e) => Err(RelayError::Body(e)),
        }
    }

    /// One outbound exchange for `path` (query string carried over)
    async fn exchange(
        &self,
        parts: &Parts,
        path: &str,
        body: RequestBody,
    ) -> Result<Response<ResponseBody>, RelayError> {
        let request = self.build_request(parts, path, body)?;
        debug!("[{path}] requesting... {}", request.uri());
        self.upstream.send(request).await
    }

    /// Target URL is the base target with the raw path appended verbatim
    fn target_url(&self, parts: &Parts, path: &str) -> String {
        match parts.uri.query() {
            Some(query) => format!("{}{path}?{query}", self.mode.target),
            None => format!("{}{path}", self.mode.target),
        }
    }

    fn build_request(
        &self,
        parts: &Parts,
        path: &str,
        body: RequestBody,
    ) -> Result<Request<RequestBody>, RelayError> {
        let url = self.target_url(parts, path);
        let uri: Uri = url.parse().map_err(|e: hyper::http::uri::InvalidUri| {
            RelayError::InvalidTarget {
                url: url.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut request = Request::new(body);
        *request.method_mut() = parts.method.clone();
        *request.uri_mut() = uri;
        *request.headers_mut() =
            outbound_headers(&parts.headers, &self.mode.headers, self.mode.host.as_ref());
        Ok(request)
    }

    /// Retry once against `path/index`; the original 404 is kept unless the
    /// retry finds something.
    async fn index_fallback(
        &self,
        parts: &Parts,
        path: &str,
        index: &str,
        body: Bytes,
        not_found: Response<ResponseBody>,
    ) -> Response<ResponseBody> {
        let index_path = if path.ends_with('/') {
            format!("{path}{index}")
        } else {
            format!("{path}/{index}")
        };
        debug!("[{path}] upstream 404, trying {index_path}");

        match self.exchange(parts, &index_path, http::full(body)).await {
            Ok(response) if response.status() != StatusCode::NOT_FOUND => response,
            Ok(_) => not_found,
            Err(e) => {
                debug!("[{index_path}] fallback failed: {e}");
                not_found
            }
        }
    }
}

/// Relay the exchange result, or 502 when the upstream could not be reached
fn finish(
    path: &str,
    result: Result<Response<ResponseBody>, RelayError>,
    defaults: &HeaderMap,
) -> Response<ResponseBody> {
    match result {
        Ok(upstream) => relay_response(upstream, defaults),
        Err(e) => {
            warn!("request {path} failed: {e}");
            with_defaults(http::build_502_response(), defaults)
        }
    }
}

/// Final response: upstream status verbatim, `defaults` overwritten by
/// upstream headers, upstream body streamed through.
pub fn relay_response(upstream: Response<ResponseBody>, defaults: &HeaderMap) -> Response<ResponseBody> {
    let (parts, body) = upstream.into_parts();
    let mut response = Response::new(body);
    *response.status_mut() = parts.status;
    *response.headers_mut() = defaults.clone();
    replace_headers(response.headers_mut(), &parts.headers);
    response
}

fn with_defaults(mut response: Response<ResponseBody>, defaults: &HeaderMap) -> Response<ResponseBody> {
    for (name, value) in defaults {
        if !response.headers().contains_key(name) {
            response.headers_mut().insert(name.clone(), value.clone());
        }
    }
    response
}
