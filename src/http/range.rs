//! HTTP Range request parsing module
//!
//! Range header parsing for resumable downloads, compliant with RFC 7233, plus recognition of
//! the completion probe clients send to check whether they already hold a whole file.

use hyper::header::{HeaderMap, IF_RANGE, RANGE};

/// Parsed Range request, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRequest {
    /// Start byte position
    pub start: u64,
    /// End byte position
    pub end: u64,
}

impl RangeRequest {
    /// Number of bytes covered by the range
    #[inline]
    pub const fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    /// Valid range request
    Valid(RangeRequest),
    /// Range not satisfiable (start >= `file_size`) - should return 416
    NotSatisfiable,
    /// No Range header or malformed (ignore, return full content)
    None,
}

/// The literal `Range` value a client sends when it believes it already has all `size` bytes
pub fn completion_probe(size: u64) -> String {
    format!("bytes={size}-")
}

/// Checks whether the request's `Range` header is exactly the completion probe for a file
/// of `size` bytes. The comparison is literal: no whitespace or case tolerance.
pub fn is_completion_probe(headers: &HeaderMap, size: u64) -> bool {
    headers
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|value| value == completion_probe(size))
}

/// Returns the `Range` header to honor, or `None` when it is absent or an `If-Range`
/// validator doesn't match the current representation.
pub fn effective_range<'a>(
    headers: &'a HeaderMap,
    etag: &str,
    last_modified: Option<&str>,
) -> Option<&'a str> {
    let range = headers.get(RANGE)?.to_str().ok()?;
    if let Some(validator) = headers.get(IF_RANGE) {
        let validator = validator.to_str().ok()?;
        if validator != etag && Some(validator) != last_modified {
            return None;
        }
    }
    Some(range)
}

/// Parse HTTP Range header (single range only, bytes unit)
///
/// Supported formats:
/// - `bytes=start-end` - Specific range
/// - `bytes=start-` - From start to end
/// - `bytes=-suffix` - Last suffix bytes
///
/// # Examples
/// ```
/// use swupd_server::http::range::{parse_range_header, RangeParseResult};
///
/// // Fixed range
/// let result = parse_range_header(Some("bytes=0-99"), 1000);
/// assert!(matches!(result, RangeParseResult::Valid(_)));
///
/// // No Range header
/// let result = parse_range_header(None, 1000);
/// assert!(matches!(result, RangeParseResult::None));
/// ```
pub fn parse_range_header(range_header: Option<&str>, file_size: u64) -> RangeParseResult {
    let Some(header) = range_header else {
        return RangeParseResult::None;
    };

    let Some(header) = header.strip_prefix("bytes=") else {
        return RangeParseResult::None; // Not bytes unit, ignore
    };

    // Only support single range (not multi-range)
    if header.contains(',') {
        return RangeParseResult::None;
    }

    let Some((start_str, end_str)) = header.split_once('-') else {
        return RangeParseResult::None;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    // Suffix range: "-500" means last 500 bytes
    if start_str.is_empty() {
        return parse_suffix_range(end_str, file_size);
    }

    // Standard range: "start-" or "start-end"
    parse_standard_range(start_str, end_str, file_size)
}

/// Parse suffix range (e.g., "-500")
fn parse_suffix_range(suffix_str: &str, file_size: u64) -> RangeParseResult {
    let Ok(suffix) = suffix_str.parse::<u64>() else {
        return RangeParseResult::None;
    };

    if suffix == 0 || file_size == 0 {
        return RangeParseResult::NotSatisfiable;
    }

    // Suffix larger than file is valid, just return whole file as range
    RangeParseResult::Valid(RangeRequest {
        start: file_size.saturating_sub(suffix),
        end: file_size - 1,
    })
}

/// Parse standard range (e.g., "0-99" or "100-")
fn parse_standard_range(start_str: &str, end_str: &str, file_size: u64) -> RangeParseResult {
    let Ok(start) = start_str.parse::<u64>() else {
        return RangeParseResult::None;
    };

    // Start beyond file size is not satisfiable
    if start >= file_size {
        return RangeParseResult::NotSatisfiable;
    }

    let end = if end_str.is_empty() {
        file_size - 1
    } else {
        let Ok(e) = end_str.parse::<u64>() else {
            return RangeParseResult::None;
        };
        if start > e {
            return RangeParseResult::NotSatisfiable;
        }
        e.min(file_size - 1)
    };

    RangeParseResult::Valid(RangeRequest { start, end })
}
