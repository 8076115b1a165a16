//! HTTP Range request parsing module
//!
//! Single-range `bytes=` requests for resumable downloads (RFC 7233).
//! Multi-range and other units are ignored and answered with the full body.

/// Inclusive byte range within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

#[allow(clippy::len_without_is_empty)] // never empty: start <= end
impl ByteRange {
    #[inline]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{total}", self.start, self.end)
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeOutcome {
    /// No usable Range header: serve the whole file
    Full,
    /// Serve this slice with 206
    Partial(ByteRange),
    /// Respond 416
    Unsatisfiable,
}

/// Parse HTTP Range header against a file of `len` bytes
///
/// Supported formats:
/// - `bytes=start-end` - Specific range (end clamped to the file)
/// - `bytes=start-` - From start to end
/// - `bytes=-suffix` - Last suffix bytes
///
/// # Examples
/// ```
/// use hou::http::range::{parse_range_header, ByteRange, RangeOutcome};
///
/// let result = parse_range_header(Some("bytes=0-99"), 1000);
/// assert_eq!(result, RangeOutcome::Partial(ByteRange { start: 0, end: 99 }));
///
/// assert_eq!(parse_range_header(None, 1000), RangeOutcome::Full);
/// ```
pub fn parse_range_header(range_header: Option<&str>, len: u64) -> RangeOutcome {
    let Some(spec) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeOutcome::Full;
    };
    if spec.contains(',') {
        return RangeOutcome::Full;
    }
    let Some((start, end)) = spec.split_once('-') else {
        return RangeOutcome::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        // Suffix range: "-500" means last 500 bytes
        return match end.parse::<u64>() {
            Ok(0) => RangeOutcome::Unsatisfiable,
            Ok(_) if len == 0 => RangeOutcome::Unsatisfiable,
            Ok(suffix) => RangeOutcome::Partial(ByteRange {
                start: len.saturating_sub(suffix),
                end: len - 1,
            }),
            Err(_) => RangeOutcome::Full,
        };
    }

    let Ok(start) = start.parse::<u64>() else {
        return RangeOutcome::Full;
    };
    if start >= len {
        return RangeOutcome::Unsatisfiable;
    }

    let end = if end.is_empty() {
        len - 1
    } else {
        match end.parse::<u64>() {
            Ok(e) if e < start => return RangeOutcome::Unsatisfiable,
            Ok(e) => e.min(len - 1),
            Err(_) => return RangeOutcome::Full,
        }
    };

    RangeOutcome::Partial(ByteRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(start: u64, end: u64) -> RangeOutcome {
        RangeOutcome::Partial(ByteRange { start, end })
    }

    #[test]
    fn test_no_range() {
        assert_eq!(parse_range_header(None, 100), RangeOutcome::Full);
        assert_eq!(parse_range_header(Some("items=0-1"), 100), RangeOutcome::Full);
    }

    #[test]
    fn test_standard_range() {
        assert_eq!(parse_range_header(Some("bytes=0-9"), 100), partial(0, 9));
        assert_eq!(parse_range_header(Some("bytes=90-500"), 100), partial(90, 99));
        assert_eq!(ByteRange { start: 0, end: 9 }.len(), 10);
    }

    #[test]
    fn test_open_range() {
        assert_eq!(parse_range_header(Some("bytes=50-"), 100), partial(50, 99));
    }

    #[test]
    fn test_suffix_range() {
        assert_eq!(parse_range_header(Some("bytes=-20"), 100), partial(80, 99));
        assert_eq!(parse_range_header(Some("bytes=-500"), 100), partial(0, 99));
    }

    #[test]
    fn test_not_satisfiable() {
        assert_eq!(
            parse_range_header(Some("bytes=200-"), 100),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=20-10"), 100),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=-0"), 100),
            RangeOutcome::Unsatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=-5"), 0),
            RangeOutcome::Unsatisfiable
        );
    }

    #[test]
    fn test_invalid_format() {
        assert_eq!(parse_range_header(Some("bytes=a-b"), 100), RangeOutcome::Full);
        assert_eq!(
            parse_range_header(Some("bytes=0-9,20-29"), 100),
            RangeOutcome::Full
        );
    }

    #[test]
    fn test_content_range() {
        assert_eq!(
            ByteRange { start: 10, end: 19 }.content_range(100),
            "bytes 10-19/100"
        );
    }
}
