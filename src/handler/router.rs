//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: every method on every path goes
//! to the active backend, and one access log line is written per request.

use crate::config::{AppState, Backend};
use crate::handler::static_files;
use crate::http::{BoxError, ResponseBody};
use crate::logger::{self, AccessLogEntry};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderName, CONTENT_LENGTH, REFERER, USER_AGENT};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub range_header: Option<String>,
}

impl<'a> RequestContext<'a> {
    pub fn from_parts(parts: &'a Parts) -> Self {
        let header = |name: HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        Self {
            path: parts.uri.path(),
            is_head: parts.method == Method::HEAD,
            if_none_match: header(hyper::header::IF_NONE_MATCH),
            if_modified_since: header(hyper::header::IF_MODIFIED_SINCE),
            range_header: header(hyper::header::RANGE),
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let settings = &state.settings;

    if settings.debug {
        log_headers(req.uri().path(), req.headers());
    }

    let entry = settings
        .logging
        .access_log
        .then(|| access_entry(&req, peer, state.is_proxy()));

    let response = match state.backend {
        Backend::Local(ref local) => {
            // the body is never read for local files
            let (parts, _) = req.into_parts();
            let ctx = RequestContext::from_parts(&parts);
            let mut response = static_files::serve(
                &ctx,
                local,
                &settings.not_found_body,
                settings.http.cache_policy,
            )
            .await;
            apply_default_headers(response.headers_mut(), &state.default_headers);
            response
        }
        Backend::Proxy(ref relay) => relay.forward(req, &state.default_headers).await,
    };

    if let Some(mut entry) = entry {
        entry.status = response.status();
        entry.bytes_sent = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        entry.elapsed = started.elapsed();
        logger::log_access(&entry, &settings.logging.access_log_format);
    }

    Ok(response)
}

/// Insert defaults the response does not already carry
fn apply_default_headers(headers: &mut HeaderMap, defaults: &HeaderMap) {
    for (name, value) in defaults {
        if !headers.contains_key(name) {
            headers.insert(name.clone(), value.clone());
        }
    }
}

fn access_entry<B>(req: &Request<B>, peer: SocketAddr, proxied: bool) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), ToString::to_string);
    let mut entry = AccessLogEntry::new(peer.ip(), req.method().clone(), target, req.version());
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.proxied = proxied;
    entry
}

fn log_headers(path: &str, headers: &HeaderMap) {
    debug!("[{path}] {} request headers", headers.len());
    for (name, value) in headers {
        debug!("[{path}]   {name}: {}", value.to_str().unwrap_or("<binary>"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::http::RequestBody;
    use crate::proxy::{RelayError, Upstream};
    use async_trait::async_trait;
    use http_body_util::{BodyExt, Full};
    use hyper::header::SERVER;
    use hyper::StatusCode;
    use std::fs;

    struct Echo;

    #[async_trait]
    impl Upstream for Echo {
        async fn send(
            &self,
            request: Request<RequestBody>,
        ) -> Result<Response<ResponseBody>, RelayError> {
            let body = format!("{} {}", request.method(), request.uri());
            Ok(Response::new(crate::http::full(body)))
        }
    }

    fn get(uri: &str) -> Request<Full<Bytes>> {
        Request::builder().uri(uri).body(Full::new(Bytes::new())).unwrap()
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    async fn body_string(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_local_mode_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "home").unwrap();
        let settings = Settings {
            base_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let state = Arc::new(AppState::new(settings).unwrap());

        let response = handle_request(get("/"), Arc::clone(&state), peer()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[SERVER].to_str().unwrap().starts_with("hou/"));
        assert_eq!(body_string(response).await, "home");
    }

    #[tokio::test]
    async fn test_local_mode_accepts_any_method() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "home").unwrap();
        let settings = Settings {
            base_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let state = Arc::new(AppState::new(settings).unwrap());

        let request = Request::builder()
            .method("DELETE")
            .uri("/anything")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = handle_request(request, state, peer()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_local_not_found_uses_configured_body() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            base_dir: dir.path().to_path_buf(),
            not_found_body: "nope".to_string(),
            debug: true,
            ..Settings::default()
        };
        let state = Arc::new(AppState::new(settings).unwrap());

        let response = handle_request(get("/missing"), state, peer()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "nope");
    }

    #[tokio::test]
    async fn test_proxy_mode_dispatch() {
        let settings = Settings {
            proxy: Some("backend.local:9000".to_string()),
            ..Settings::default()
        };
        let state = Arc::new(AppState::with_upstream(settings, Some(Arc::new(Echo))).unwrap());
        assert!(state.is_proxy());

        let response = handle_request(get("/api/x?y=1"), state, peer()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "GET http://backend.local:9000/api/x?y=1"
        );
    }

    #[test]
    fn test_access_entry_fields() {
        let request = Request::builder()
            .uri("/page?x=1")
            .header(USER_AGENT, "curl/8.0")
            .body(())
            .unwrap();
        let entry = access_entry(&request, peer(), true);
        assert_eq!(entry.peer.to_string(), "127.0.0.1");
        assert_eq!(entry.target, "/page?x=1");
        assert_eq!(entry.version, hyper::Version::HTTP_11);
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(entry.referer, None);
        assert!(entry.proxied);
    }
}
