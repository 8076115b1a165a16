//! Forwarding proxy
//!
//! Relays every request to one configured target and streams the answer back.

pub mod client;
pub mod forwarding;
pub mod headers;

pub use client::{ReqwestUpstream, Upstream};
pub use forwarding::Relay;

/// Failures of a single relayed exchange. None of them is fatal to the server.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Connection refused, DNS failure, timeout, ...
    #[error("upstream request failed: {0}")]
    Transport(#[source] crate::http::BoxError),

    #[error("invalid upstream url '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: u64 },

    #[error("failed to read request body: {0}")]
    Body(#[source] crate::http::BoxError),
}
