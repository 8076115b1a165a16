//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension.

use std::path::Path;

/// Get MIME Content-Type for a file path
///
/// Textual types carry an explicit UTF-8 charset.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use hou::http::mime::content_type;
/// assert_eq!(content_type(Path::new("index.html")), "text/html; charset=utf-8");
/// assert_eq!(content_type(Path::new("clip.mp4")), "video/mp4");
/// assert_eq!(content_type(Path::new("LICENSE")), "application/octet-stream");
/// ```
pub fn content_type(path: &Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let needs_charset = mime.type_() == mime_guess::mime::TEXT
        || matches!(mime.subtype().as_str(), "javascript" | "json");

    if needs_charset {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.essence_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(content_type(Path::new("a.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("a.css")), "text/css; charset=utf-8");
        assert_eq!(content_type(Path::new("a.json")), "application/json; charset=utf-8");
        assert_eq!(content_type(Path::new("a.png")), "image/png");
        assert_eq!(content_type(Path::new("a.wasm")), "application/wasm");
        assert_eq!(content_type(Path::new("docs/a.mp4")), "video/mp4");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(content_type(Path::new("a.xyzzy")), "application/octet-stream");
        assert_eq!(content_type(Path::new("Makefile")), "application/octet-stream");
    }
}
