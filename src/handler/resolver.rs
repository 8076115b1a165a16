//! Local file resolution
//!
//! Decides which file answers a request path: the path itself, the index
//! file inside it when it is a directory, or the configured default file.

use crate::config::LocalMode;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Percent-decode and lexically clean a request path into a relative path.
///
/// `.` segments are dropped and `..` pops the previous segment but never
/// climbs above the root, so joining the result onto a base directory cannot
/// escape it. Returns `None` when the decoded path is not valid UTF-8.
pub fn clean_request_path(raw: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(raw).ok()?;

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    Some(segments.iter().collect())
}

/// Candidate list for a request: the joined request path, then the default file.
/// A path that does not decode cleanly has no candidates at all.
pub fn candidates(local: &LocalMode, raw_path: &str) -> Vec<PathBuf> {
    let Some(relative) = clean_request_path(raw_path) else {
        return Vec::new();
    };
    vec![
        local.base_dir.join(relative),
        local.base_dir.join(&local.default_file),
    ]
}

/// Return the first candidate that resolves to a regular file.
///
/// A directory candidate is replaced by `directory/index_file`; that single
/// level is the only descent, so an index entry that is itself a directory
/// counts as not found. Candidates are checked strictly in order.
pub async fn resolve(index_file: &str, candidates: &[PathBuf]) -> Option<PathBuf> {
    for candidate in candidates {
        debug!("[{}] checking...", candidate.display());
        let Ok(metadata) = fs::metadata(candidate).await else {
            continue;
        };

        if metadata.is_file() {
            return Some(candidate.clone());
        }

        if metadata.is_dir() {
            let index = candidate.join(index_file);
            debug!("[{}] is dir, trying {}", candidate.display(), index.display());
            if is_file(&index).await {
                return Some(index);
            }
        }
    }
    None
}

/// Resolve a raw request path in local mode
pub async fn resolve_request(local: &LocalMode, raw_path: &str) -> Option<PathBuf> {
    resolve(&local.index_file, &candidates(local, raw_path)).await
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file())
}
