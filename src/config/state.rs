// Application state module
// Immutable per-server state shared by every connection task

use hyper::header::{HeaderMap, HeaderValue, SERVER};
use std::sync::Arc;

use super::types::{LocalMode, Mode, Settings};
use super::ConfigError;
use crate::proxy::{Relay, ReqwestUpstream, Upstream};

/// The active resolution strategy. The two variants share no runtime state.
pub enum Backend {
    Local(LocalMode),
    Proxy(Relay),
}

/// Application state
pub struct AppState {
    pub settings: Settings,
    pub backend: Backend,
    /// Headers every response starts with (currently just `Server`)
    pub default_headers: HeaderMap,
}

impl AppState {
    /// Build the state with the production upstream client in proxy mode
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        Self::with_upstream(settings, None)
    }

    /// Build the state around a caller-supplied upstream transport.
    /// `upstream` is ignored in local mode; `None` in proxy mode builds the
    /// pooled client once here.
    pub fn with_upstream(
        settings: Settings,
        upstream: Option<Arc<dyn Upstream>>,
    ) -> Result<Self, ConfigError> {
        let backend = match settings.mode()? {
            Mode::Local(local) => Backend::Local(local),
            Mode::Proxy(proxy) => {
                let upstream = match upstream {
                    Some(upstream) => upstream,
                    None => Arc::new(ReqwestUpstream::new(proxy.timeout)?),
                };
                Backend::Proxy(Relay::new(proxy, upstream))
            }
        };

        let mut default_headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&settings.http.server_name) {
            default_headers.insert(SERVER, value);
        }

        Ok(Self {
            settings,
            backend,
            default_headers,
        })
    }

    pub const fn is_proxy(&self) -> bool {
        matches!(self.backend, Backend::Proxy(_))
    }
}
