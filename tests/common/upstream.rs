//! Upstream servers the proxy tests relay to

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub type UpstreamBody = UnsyncBoxBody<Bytes, Infallible>;

fn seen(req: &Request<Incoming>, name: &str) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

/// Reports what it received: `"{method} {path?query} {body}"` plus
/// `x-seen-*` headers. `/created` answers 201, `/app` and `/missing*` 404.
pub async fn echo(req: Request<Incoming>) -> Result<Response<UpstreamBody>, Infallible> {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let target = req
        .uri()
        .path_and_query()
        .map(ToString::to_string)
        .unwrap_or_default();
    let host = seen(&req, "host");
    let key = seen(&req, "x-api-key");
    let client = seen(&req, "x-client");
    let body = req
        .into_body()
        .collect()
        .await
        .map(|c| c.to_bytes())
        .unwrap_or_default();

    let status = match path.as_str() {
        "/created" => 201,
        "/app" => 404,
        p if p.starts_with("/missing") => 404,
        _ => 200,
    };

    let response = Response::builder()
        .status(status)
        .header("server", "echo-upstream")
        .header("x-seen-host", host)
        .header("x-seen-key", key)
        .header("x-seen-client", client)
        .header("x-seen-length", body.len().to_string())
        .header("set-cookie", "a=1")
        .header("set-cookie", "b=2")
        .body(
            Full::new(Bytes::from(format!(
                "{method} {target} {}",
                String::from_utf8_lossy(&body)
            )))
            .boxed_unsync(),
        )
        .unwrap();
    Ok(response)
}

/// Serve `handler` on an ephemeral loopback port
pub async fn serve<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(Request<Incoming>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<UpstreamBody>, Infallible>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                continue;
            };
            let handler = handler.clone();
            tokio::spawn(async move {
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service_fn(handler))
                    .await;
            });
        }
    });
    addr
}

pub async fn start_echo() -> SocketAddr {
    serve(echo).await
}
