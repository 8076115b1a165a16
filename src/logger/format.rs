//! Access line rendering.
//!
//! The server writes one line per request on the access target. The line
//! layout comes from `logging.access_log_format`: one of the named layouts
//! `combined`, `common` and `json`, or any other string taken as a pattern
//! with `$variable` placeholders.

use chrono::{DateTime, Local};
use hyper::{Method, StatusCode, Version};
use std::fmt::Write;
use std::net::IpAddr;
use std::time::Duration;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Everything known about one served request
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub peer: IpAddr,
    pub received_at: DateTime<Local>,
    pub method: Method,
    /// Path plus query exactly as the client sent it
    pub target: String,
    pub version: Version,
    pub status: StatusCode,
    /// Declared response length; `None` for streamed bodies of unknown size
    pub bytes_sent: Option<u64>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub elapsed: Duration,
    /// Whether the request went to the upstream instead of the filesystem
    pub proxied: bool,
}

/// Line layout selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessFormat<'a> {
    Combined,
    Common,
    Json,
    Pattern(&'a str),
}

impl<'a> AccessFormat<'a> {
    pub fn parse(format: &'a str) -> Self {
        match format.trim() {
            "combined" => Self::Combined,
            "common" => Self::Common,
            "json" => Self::Json,
            _ => Self::Pattern(format),
        }
    }
}

impl AccessLogEntry {
    pub fn new(peer: IpAddr, method: Method, target: String, version: Version) -> Self {
        Self {
            peer,
            received_at: Local::now(),
            method,
            target,
            version,
            status: StatusCode::OK,
            bytes_sent: None,
            referer: None,
            user_agent: None,
            elapsed: Duration::ZERO,
            proxied: false,
        }
    }

    pub fn render(&self, format: AccessFormat<'_>) -> String {
        match format {
            AccessFormat::Common => self.render_pattern(COMMON),
            AccessFormat::Combined => self.render_pattern(COMBINED),
            AccessFormat::Json => self.render_json(),
            AccessFormat::Pattern(pattern) => self.render_pattern(pattern),
        }
    }

    /// `GET /a?b=1 HTTP/1.1`
    fn request_line(&self) -> String {
        format!("{} {} {:?}", self.method, self.target, self.version)
    }

    fn backend(&self) -> &'static str {
        if self.proxied {
            "proxy"
        } else {
            "local"
        }
    }

    fn render_json(&self) -> String {
        serde_json::json!({
            "remote_addr": self.peer,
            "time": self.received_at.to_rfc3339(),
            "method": self.method.as_str(),
            "target": self.target,
            "protocol": format!("{:?}", self.version),
            "status": self.status.as_u16(),
            "bytes_sent": self.bytes_sent,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": u64::try_from(self.elapsed.as_micros()).unwrap_or(u64::MAX),
            "backend": self.backend(),
        })
        .to_string()
    }

    /// Expand `$name` placeholders. A name is the longest run of lowercase
    /// letters and underscores after `$`; unknown names stay as written.
    fn render_pattern(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() + 64);
        let mut rest = pattern;

        while let Some(dollar) = rest.find('$') {
            out.push_str(&rest[..dollar]);
            let after = &rest[dollar + 1..];
            let len = after
                .find(|c: char| !(c.is_ascii_lowercase() || c == '_'))
                .unwrap_or(after.len());
            let name = &after[..len];
            if !self.write_variable(&mut out, name) {
                out.push('$');
                out.push_str(name);
            }
            rest = &after[len..];
        }
        out.push_str(rest);
        out
    }

    fn write_variable(&self, out: &mut String, name: &str) -> bool {
        // writing into a String cannot fail
        let _ = match name {
            "remote_addr" => write!(out, "{}", self.peer),
            "time_local" => write!(out, "{}", self.received_at.format(CLF_TIME)),
            "time_iso8601" => write!(out, "{}", self.received_at.to_rfc3339()),
            "request" => write!(out, "{}", self.request_line()),
            "request_method" => write!(out, "{}", self.method),
            "request_uri" => write!(out, "{}", self.target),
            "uri" => write!(out, "{}", self.target.split('?').next().unwrap_or_default()),
            "server_protocol" => write!(out, "{:?}", self.version),
            "status" => write!(out, "{}", self.status.as_u16()),
            "body_bytes_sent" => match self.bytes_sent {
                Some(bytes) => write!(out, "{bytes}"),
                None => write!(out, "-"),
            },
            "http_referer" => write!(out, "{}", self.referer.as_deref().unwrap_or("-")),
            "http_user_agent" => write!(out, "{}", self.user_agent.as_deref().unwrap_or("-")),
            "request_time" => write!(out, "{:.3}", self.elapsed.as_secs_f64()),
            "backend" => write!(out, "{}", self.backend()),
            _ => return false,
        };
        true
    }
}

const COMMON: &str = "$remote_addr - - [$time_local] \"$request\" $status $body_bytes_sent";
const COMBINED: &str = "$remote_addr - - [$time_local] \"$request\" $status $body_bytes_sent \"$http_referer\" \"$http_user_agent\"";
