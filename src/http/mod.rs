//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from specific business logic.
//! Shared between static file serving and the forwarding proxy.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;

/// Error type carried by response bodies (file reads, upstream streams)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type of every response the server produces. File and upstream bodies
/// are streamed, fixed bodies are wrapped.
pub type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;

/// Body of an outbound relayed request: the client's stream or a buffered copy
pub type RequestBody = UnsyncBoxBody<Bytes, BoxError>;

// Re-export commonly used types
pub use range::{parse_range_header, ByteRange, RangeOutcome};
pub use response::{
    build_304_response, build_400_response, build_404_response, build_413_response,
    build_416_response, build_502_response,
};

/// Wrap a fixed body
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Empty body
pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}
