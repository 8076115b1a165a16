// Connection handling module
// Accepts a single TCP connection and serves it on its own task

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept a connection, checking the connection limit.
///
/// The counter is incremented before the check and rolled back on reject,
/// so concurrent accepts cannot both slip under the limit.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    graceful: &GracefulShutdown,
) {
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.settings.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_connection_rejected(prev_count, max_conn);
            drop(stream);
            return;
        }
    }

    debug!("[Connection] Accepted from: {peer_addr}");
    handle_connection(stream, peer_addr, Arc::clone(state), Arc::clone(conn_counter), graceful);
}

/// Serve one connection in a spawned task.
///
/// HTTP/1.1 with the configured keep-alive and header read timeout; the
/// connection is registered with `graceful` so shutdown can drain it.
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
    graceful: &GracefulShutdown,
) {
    let io = TokioIo::new(stream);
    let performance = &state.settings.performance;

    let mut builder = http1::Builder::new();
    builder
        .keep_alive(performance.keep_alive)
        .timer(TokioTimer::new())
        .header_read_timeout(Duration::from_secs(performance.header_read_timeout));

    let service_state = Arc::clone(&state);
    let conn = builder.serve_connection(
        io,
        service_fn(move |req: Request<Incoming>| {
            handler::handle_request(req, Arc::clone(&service_state), peer_addr)
        }),
    );
    let conn = graceful.watch(conn);

    tokio::spawn(async move {
        if let Err(err) = conn.await {
            logger::log_connection_error(&peer_addr, &err);
        }
        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
