//! Logger module
//!
//! Provides logging utilities for the HTTP server including:
//! - Subscriber installation (text or JSON, `RUST_LOG` aware)
//! - Server lifecycle logging
//! - Access logging with multiple formats

mod format;

pub use format::{AccessFormat, AccessLogEntry};

use crate::config::{LogFormat, LoggingConfig, Settings};
use crate::http::BoxError;
use std::net::SocketAddr;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Target access lines are emitted on
pub const ACCESS_TARGET: &str = "hou::access";

/// Install the global subscriber.
///
/// Should be called once at application startup. `RUST_LOG` wins over the
/// configured level; `verbose` lowers the configured level to `debug`.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<(), BoxError> {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
}

pub fn log_server_start(addr: &SocketAddr, settings: &Settings) {
    info!("======================================");
    info!("Async server started successfully");
    info!("Listening on: http://{addr}");
    info!("Log level: {}", if settings.verbose { "debug" } else { settings.logging.level.as_str() });
    if let Some(workers) = settings.performance.workers {
        info!("Worker threads: {workers}");
    }
    match settings.proxy_target() {
        Some(target) => info!("Mode: proxy -> {target}"),
        None => info!("Mode: local files in {}", settings.base_dir.display()),
    }
    info!("======================================");
}

/// Log the startup configuration table, one line per row
pub fn log_config_table(settings: &Settings) {
    for line in settings.config_table().lines() {
        info!("{line}");
    }
    info!("{settings}");
}

pub fn log_connection_error(peer: &SocketAddr, err: &impl std::fmt::Display) {
    error!("Failed to serve connection from {peer}: {err}");
}

pub fn log_connection_rejected(active: usize, max: u64) {
    warn!("Max connections reached: {active}/{max}. Connection rejected.");
}

pub fn log_shutdown(in_flight: usize, grace_secs: u64) {
    info!("Shutdown requested, waiting up to {grace_secs}s for {in_flight} connection(s)");
}

/// Write one access line; status and timing also go out as fields
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    info!(
        target: ACCESS_TARGET,
        status = entry.status.as_u16(),
        elapsed_us = u64::try_from(entry.elapsed.as_micros()).unwrap_or(u64::MAX),
        proxied = entry.proxied,
        "{}",
        entry.render(AccessFormat::parse(format))
    );
}
