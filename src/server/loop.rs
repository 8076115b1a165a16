// Server loop module
// Accepts connections until the shutdown future resolves, then drains

use hyper_util::server::graceful::GracefulShutdown;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Accept loop.
///
/// Once `shutdown` resolves the listener is closed and in-flight connections
/// get `performance.shutdown_grace_secs` to finish before they are dropped.
pub async fn start_server_loop<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let graceful = GracefulShutdown::new();
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, &graceful);
                    }
                    Err(e) => error!("Failed to accept connection: {e}"),
                }
            }

            () = &mut shutdown => break,
        }
    }

    drop(listener);

    let grace_secs = state.settings.performance.shutdown_grace_secs;
    logger::log_shutdown(active_connections.load(Ordering::SeqCst), grace_secs);

    tokio::select! {
        () = graceful.shutdown() => info!("All connections closed"),
        () = tokio::time::sleep(Duration::from_secs(grace_secs)) => {
            warn!(
                "Grace period elapsed, dropping {} connection(s)",
                active_connections.load(Ordering::SeqCst)
            );
        }
    }
    Ok(())
}
