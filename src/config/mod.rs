// Configuration module entry point
// Loads layered settings and turns them into the immutable resolution mode

mod cli;
mod state;
mod types;

use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Re-export public types
pub use cli::Cli;
pub use state::{AppState, Backend};
pub use types::{
    HttpConfig, LocalMode, LogFormat, LoggingConfig, Mode, PerformanceConfig, ProxyMode, Settings,
};

/// Errors detected while assembling the configuration. All of them are fatal
/// and reported before the server starts listening.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("invalid proxy header '{entry}': expected key:value")]
    MalformedHeader { entry: String },

    #[error("invalid proxy header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("invalid proxy target '{target}': {reason}")]
    InvalidProxy { target: String, reason: String },

    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: &'static str },

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

impl Settings {
    /// Load settings: defaults, then config files, then `HOU_*` environment
    /// variables, then command line flags.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        for file in config_files(cli.config.as_deref()) {
            builder = builder.add_source(file);
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("HOU")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option(
                "base_dir",
                cli.base_dir.as_ref().map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option("default_file", cli.default_file.clone())?
            .set_override_option("index_file", cli.index_file.clone())?
            .set_override_option("port", cli.port.map(i64::from))?
            .set_override_option("host", cli.host.clone())?
            .set_override_option("proxy", cli.proxy.clone())?
            .set_override_option("debug", cli.debug.then_some(true))?
            .set_override_option("verbose", cli.verbose.then_some(true))?
            .build()?;

        // Header names are case-insensitive: fold them so a flag replaces the
        // file entry for the same header.
        let mut settings: Self = settings.try_deserialize()?;
        settings.proxy_headers = std::mem::take(&mut settings.proxy_headers)
            .into_iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), value))
            .collect();
        for entry in &cli.proxy_headers {
            let (key, value) = split_header_entry(entry)?;
            settings
                .proxy_headers
                .insert(key.to_ascii_lowercase(), value.to_string());
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would only fail later, at runtime construction
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.performance.workers == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "performance.workers",
                reason: "must be at least 1",
            });
        }
        if self.performance.max_connections == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "performance.max_connections",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Index file name, falling back to the default file when unset
    pub fn index_file(&self) -> &str {
        match self.index_file.as_deref() {
            Some(index) if !index.is_empty() => index,
            _ => &self.default_file,
        }
    }

    /// Normalized proxy target, `None` when running in local mode
    pub fn proxy_target(&self) -> Option<String> {
        let proxy = self.proxy.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
        let mut target = if proxy.starts_with("http://") || proxy.starts_with("https://") {
            proxy.to_string()
        } else {
            format!("http://{proxy}")
        };
        if target.ends_with('/') {
            target.pop();
        }
        Some(target)
    }

    /// Resolve the single active mode for this server instance
    pub fn mode(&self) -> Result<Mode, ConfigError> {
        let Some(target) = self.proxy_target() else {
            return Ok(Mode::Local(LocalMode {
                base_dir: self.base_dir.clone(),
                default_file: self.default_file.clone(),
                index_file: self.index_file().to_string(),
            }));
        };

        let url = reqwest::Url::parse(&target).map_err(|e| ConfigError::InvalidProxy {
            target: target.clone(),
            reason: e.to_string(),
        })?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => Some(format!("{host}:{port}")),
            (Some(host), None) => Some(host.to_string()),
            (None, _) => None,
        };
        let host = host
            .map(|h| HeaderValue::from_str(&h))
            .transpose()
            .map_err(|e| ConfigError::InvalidProxy {
                target: target.clone(),
                reason: e.to_string(),
            })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.proxy_headers {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }

        Ok(Mode::Proxy(ProxyMode {
            target,
            host,
            headers,
            index_fallback: self
                .proxy_index_fallback
                .then(|| self.index_file().to_string()),
            timeout: Duration::from_secs(self.proxy_timeout_secs),
            max_body_size: self.http.max_body_size,
        }))
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    /// Two-column summary printed at startup
    pub fn config_table(&self) -> String {
        let hostname = gethostname::gethostname()
            .into_string()
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "127.0.0.1".to_string());

        let mut rows = vec![
            ("Endpoint", format!("http://{hostname}:{}", self.port)),
            ("Debug", self.debug.to_string()),
            ("Index", self.index_file().to_string()),
            ("Default", self.default_file.clone()),
            ("Not Found", truncate(&self.not_found_body, 20).to_string()),
            ("Proxy", self.proxy_target().unwrap_or_default()),
        ];
        if self.proxy_target().is_none() {
            rows.push(("Base", self.base_dir.display().to_string()));
        }
        for (key, value) in &self.proxy_headers {
            rows.push(("Proxy Headers", format!("{key}:{value}")));
        }

        let key_width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0).max(6);
        let value_width = rows.iter().map(|(_, v)| v.len()).max().unwrap_or(0).max(5);
        let border = format!("+-{}-+-{}-+", "-".repeat(key_width), "-".repeat(value_width));

        let mut table = String::new();
        table.push_str(&border);
        table.push('\n');
        table.push_str(&format!(
            "| {:key_width$} | {:value_width$} |\n",
            "OPTION", "VALUE"
        ));
        table.push_str(&border);
        table.push('\n');
        let mut previous = "";
        for &(key, ref value) in &rows {
            // Merge repeated option names like "Proxy Headers"
            let shown = if key == previous { "" } else { key };
            previous = key;
            table.push_str(&format!("| {shown:key_width$} | {value:value_width$} |\n"));
        }
        table.push_str(&border);
        table
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hou[:{}][Index({}), Default({}) Debug({}) Not Found({}...)]",
            self.port,
            self.index_file(),
            self.default_file,
            self.debug,
            truncate(&self.not_found_body, 5)
        )
    }
}

/// Split a `key:value` proxy header entry. Only the first colon separates,
/// so values may themselves contain colons.
pub fn split_header_entry(entry: &str) -> Result<(&str, &str), ConfigError> {
    match entry.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(ConfigError::MalformedHeader {
            entry: entry.to_string(),
        }),
    }
}

/// Validate a header name/value pair for outbound requests
pub fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidHeader {
        name: name.to_string(),
        reason,
    };
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
    Ok((header_name, header_value))
}

/// Config files in increasing precedence. An explicit file must exist; the
/// searched locations are optional and `./hou.*` wins over `/etc/hou.*`.
fn config_files(explicit: Option<&Path>) -> Vec<config::File<config::FileSourceFile, config::FileFormat>> {
    if let Some(path) = explicit {
        return vec![config::File::from(path).required(true)];
    }

    let mut dirs = vec![PathBuf::from("/etc")];
    if let Some(home) = std::env::var_os("HOME") {
        dirs.push(PathBuf::from(home).join(".hou"));
    }
    dirs.push(PathBuf::from("."));

    dirs.into_iter()
        .map(|dir| config::File::with_name(&dir.join("hou").to_string_lossy()).required(false))
        .collect()
}

fn truncate(s: &str, max_chars: usize) -> &str {
    s.char_indices().nth(max_chars).map_or(s, |(idx, _)| &s[..idx])
}
