// Server module entry
// Binds the listener and runs the accept loop until shutdown

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is exposed as server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::create_listener;
pub use server_loop::start_server_loop;
pub use signal::shutdown_signal;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{AppState, ConfigError, Settings};
use crate::logger;

/// Errors that stop the server from starting
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bound server, ready to accept connections
pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl Server {
    /// Validate `settings`, build the application state and bind the
    /// configured address. Must be called from within a tokio runtime.
    pub fn bind(settings: Settings) -> Result<Self, ServerError> {
        let addr = settings.socket_addr()?;
        let state = AppState::new(settings)?;
        Self::with_state(state, addr)
    }

    /// Bind `addr` around an already-built state (tests inject a fake
    /// upstream this way)
    pub fn with_state(state: AppState, addr: SocketAddr) -> Result<Self, ServerError> {
        let listener =
            create_listener(addr).map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Self {
            listener,
            state: Arc::new(state),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Serve until `shutdown` resolves, then drain in-flight connections
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        logger::log_server_start(&addr, &self.state.settings);
        start_server_loop(self.listener, self.state, shutdown).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            base_dir: dir.path().to_path_buf(),
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Settings::default()
        };
        let server = Server::bind(settings).unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
        assert!(!server.state().is_proxy());
    }

    #[tokio::test]
    async fn test_bind_rejects_bad_host() {
        let settings = Settings {
            host: "not an address".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            Server::bind(settings),
            Err(ServerError::Config(ConfigError::InvalidAddress(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            base_dir: dir.path().to_path_buf(),
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Settings::default()
        };
        let server = Server::bind(settings).unwrap();
        server.run(std::future::ready(())).await.unwrap();
    }
}
