//! Request handler module
//!
//! Responsible for request dispatch and the local-mode side of it: path
//! resolution and file serving. Proxy mode lives in [`crate::proxy`].

pub mod resolver;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::{handle_request, RequestContext};
