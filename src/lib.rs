//! hou: a static file server with SPA fallback and a transparent forwarding
//! proxy mode.
//!
//! In local mode a request path resolves against a base directory (the file
//! itself, a directory's index file, or the default file). In proxy mode every
//! request is relayed to one remote target with optional static headers.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod proxy;
pub mod server;

pub use config::{AppState, Cli, ConfigError, Mode, Settings};
pub use proxy::{RelayError, Upstream};
pub use server::{Server, ServerError};
