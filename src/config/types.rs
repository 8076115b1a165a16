// Configuration types module
// Defines all configuration-related data structures

use crate::http::cache::CachePolicy;
use hyper::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
///
/// Assembled once from defaults, config files, environment and CLI flags.
/// Read-only after the server starts.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Root directory for local file resolution
    pub base_dir: PathBuf,
    /// Fallback page served when nothing else matches (SPA routing)
    pub default_file: String,
    /// File searched for inside directories; falls back to `default_file`
    #[serde(default)]
    pub index_file: Option<String>,
    /// Remote target; when non-empty the server runs as a forwarding proxy
    #[serde(default)]
    pub proxy: Option<String>,
    /// Headers set on every proxied request
    #[serde(default)]
    pub proxy_headers: BTreeMap<String, String>,
    /// Retry `path/index_file` upstream when the target answers 404
    #[serde(default)]
    pub proxy_index_fallback: bool,
    /// Total timeout for one upstream exchange, in seconds
    pub proxy_timeout_secs: u64,
    /// Body of every 404 response
    pub not_found_body: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub verbose: bool,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            default_file: "index.html".to_string(),
            index_file: None,
            proxy: None,
            proxy_headers: BTreeMap::new(),
            proxy_index_fallback: false,
            proxy_timeout_secs: 300,
            not_found_body: "File Not Found".to_string(),
            host: "0.0.0.0".to_string(),
            port: 6789,
            debug: false,
            verbose: false,
            logging: LoggingConfig::default(),
            performance: PerformanceConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Log output format
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            access_log: true,
            access_log_format: "combined".to_string(),
        }
    }
}

/// Performance configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    /// Runtime worker threads; CPU count when unset
    #[serde(default)]
    pub workers: Option<usize>,
    pub keep_alive: bool,
    /// Seconds a client has to send the request head
    pub header_read_timeout: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
    /// Seconds in-flight connections get to finish on shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            workers: None,
            keep_alive: true,
            header_read_timeout: 30,
            max_connections: None,
            shutdown_grace_secs: 10,
        }
    }
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    /// Largest request body accepted for relaying, in bytes
    pub max_body_size: u64,
    pub cache_policy: CachePolicy,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            server_name: concat!("hou/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_size: 10_485_760, // 10MB
            cache_policy: CachePolicy::NoCache,
        }
    }
}

/// Resolution mode, selected once from [`Settings::mode`].
#[derive(Debug, Clone)]
pub enum Mode {
    Local(LocalMode),
    Proxy(ProxyMode),
}

/// Serve files below `base_dir`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMode {
    pub base_dir: PathBuf,
    pub default_file: String,
    pub index_file: String,
}

/// Forward every request to `target`
#[derive(Debug, Clone)]
pub struct ProxyMode {
    /// Normalized base URL without trailing slash, e.g. `http://backend.local:9000`
    pub target: String,
    /// `Host` value for outbound requests (`host[:port]` of the target)
    pub host: Option<HeaderValue>,
    pub headers: HeaderMap,
    /// Index file to retry with when upstream answers 404
    pub index_fallback: Option<String>,
    pub timeout: Duration,
    pub max_body_size: u64,
}
