//! HTTP cache control module
//!
//! Provides validators (`ETag`, `Last-Modified`) derived from file metadata
//! and conditional request handling. The server itself never caches.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::Metadata;

/// `IMF-fixdate` layout used by `Last-Modified` / `If-Modified-Since`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Validators for one file version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    /// Quoted `ETag`, e.g. `"65f1a2b3-1a4"`
    pub etag: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl Validators {
    /// Build validators from size and modification time; no file content is read.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        Self::new(metadata.len(), last_modified)
    }

    pub fn new(len: u64, last_modified: Option<DateTime<Utc>>) -> Self {
        let secs = last_modified.map_or(0, |t| t.timestamp());
        Self {
            etag: format!("\"{secs:x}-{len:x}\""),
            last_modified,
        }
    }

    /// `Last-Modified` header value
    pub fn last_modified_header(&self) -> Option<String> {
        self.last_modified.map(|t| format_http_date(&t))
    }

    /// Whether the client's cached copy is still current (respond 304).
    ///
    /// `If-None-Match` takes precedence; `If-Modified-Since` is only
    /// consulted when it is absent.
    pub fn is_not_modified(&self, if_none_match: Option<&str>, if_modified_since: Option<&str>) -> bool {
        if if_none_match.is_some() {
            return check_etag_match(if_none_match, &self.etag);
        }

        match (self.last_modified, if_modified_since.and_then(parse_http_date)) {
            (Some(modified), Some(since)) => modified.timestamp() <= since.timestamp(),
            _ => false,
        }
    }
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Weak `ETags`: `W/"abc123"` (weak comparison)
/// - Wildcard: `*`
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').any(|e| {
            let e = e.trim();
            e == "*" || e.strip_prefix("W/").unwrap_or(e) == etag
        })
    })
}

pub fn format_http_date(time: &DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}

/// Cache control policy for served files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Public cache with specified max-age (seconds)
    Public(u32),
    /// Private cache (browser cache only)
    Private(u32),
    /// Cache, but revalidate on every use
    #[default]
    NoCache,
    /// No store
    NoStore,
}

impl CachePolicy {
    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::Private(max_age) => format!("private, max-age={max_age}"),
            Self::NoCache => "no-cache".to_string(),
            Self::NoStore => "no-store".to_string(),
        }
    }
}
