#![allow(dead_code)]

pub mod upstream;

use hou::{AppState, Server, Settings};
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A server running on an ephemeral loopback port
pub struct Running {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), hou::ServerError>>,
}

impl Running {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

pub fn loopback(mut settings: Settings) -> Settings {
    settings.host = "127.0.0.1".to_string();
    settings.port = 0;
    settings.logging.access_log = false;
    settings.performance.shutdown_grace_secs = 1;
    settings
}

pub fn start(settings: Settings) -> Running {
    spawn(Server::bind(loopback(settings)).unwrap())
}

pub fn start_with_state(state: AppState) -> Running {
    let addr = "127.0.0.1:0".parse().unwrap();
    spawn(Server::with_state(state, addr).unwrap())
}

fn spawn(server: Server) -> Running {
    let addr = server.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run(async {
        let _ = rx.await;
    }));
    Running {
        addr,
        shutdown: Some(tx),
        handle,
    }
}

/// Test client that never goes through an environment proxy
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
