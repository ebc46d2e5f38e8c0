//! HTTP cache validation module
//!
//! Provides `ETag`/`Last-Modified` validators for files on disk and conditional request
//! evaluation. Validators come from file metadata only, file contents are never hashed.

use chrono::{DateTime, Utc};
use hyper::header::{
    HeaderMap, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Outcome of evaluating conditional request headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Serve the representation normally
    Proceed,
    /// `If-None-Match`/`If-Modified-Since` matched - should return 304
    NotModified,
    /// `If-Match`/`If-Unmodified-Since` failed - should return 412
    Failed,
}

/// Cache validators for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    /// Quoted strong `ETag` encoding modification time and size, e.g. `"5f3a1c2b-1000"`
    pub etag: String,
    /// Modification time in IMF-fixdate format if the filesystem reports one
    pub last_modified: Option<String>,
}

impl Validators {
    pub fn new(size: u64, modified: Option<SystemTime>) -> Self {
        let secs = modified
            .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs());
        Self {
            etag: format!("\"{secs:x}-{size:x}\""),
            last_modified: modified.map(format_http_date),
        }
    }

    /// Evaluates the conditional headers of a request against these validators
    ///
    /// `If-Match` takes precedence over `If-Unmodified-Since` and `If-None-Match` over
    /// `If-Modified-Since`, as in RFC 7232 section 6.
    pub fn evaluate(&self, headers: &HeaderMap) -> Precondition {
        if let Some(value) = header_str(headers, &IF_MATCH) {
            if !check_etag_match(Some(value), &self.etag) {
                return Precondition::Failed;
            }
        } else if let Some(value) = header_str(headers, &IF_UNMODIFIED_SINCE) {
            if self.last_modified.as_deref().is_some_and(|m| m != value) {
                return Precondition::Failed;
            }
        }

        if let Some(value) = header_str(headers, &IF_NONE_MATCH) {
            if check_etag_match(Some(value), &self.etag) {
                return Precondition::NotModified;
            }
        } else if let Some(value) = header_str(headers, &IF_MODIFIED_SINCE) {
            if self.last_modified.as_deref() == Some(value) {
                return Precondition::NotModified;
            }
        }

        Precondition::Proceed
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &hyper::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Formats a timestamp the way HTTP date headers expect, e.g.
/// `Wed, 21 Oct 2015 07:28:00 GMT`
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Check if client's `If-None-Match`/`If-Match` header matches the server's `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Wildcard: `*`
pub fn check_etag_match(client_etags: Option<&str>, etag: &str) -> bool {
    client_etags.is_some_and(|client_etag| {
        client_etag
            .split(',')
            .any(|e| e.trim() == etag || e.trim() == "*")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;
    use std::time::Duration;

    fn validators() -> Validators {
        Validators::new(4096, Some(UNIX_EPOCH + Duration::from_secs(1_445_412_480)))
    }

    fn with_header(name: hyper::header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_validators() {
        let v = validators();
        assert_eq!(v.etag, "\"56273e80-1000\"");
        assert_eq!(
            v.last_modified.as_deref(),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
        assert_eq!(Validators::new(0, None).etag, "\"0-0\"");
    }

    #[test]
    fn test_check_etag_match() {
        let etag = "\"abc123\"";
        assert!(check_etag_match(Some("\"abc123\""), etag));
        assert!(check_etag_match(Some("\"xyz\", \"abc123\""), etag));
        assert!(check_etag_match(Some("*"), etag));
        assert!(!check_etag_match(Some("\"different\""), etag));
        assert!(!check_etag_match(None, etag));
    }

    #[test]
    fn test_not_modified() {
        let v = validators();
        assert_eq!(
            v.evaluate(&with_header(IF_NONE_MATCH, &v.etag)),
            Precondition::NotModified
        );
        assert_eq!(
            v.evaluate(&with_header(IF_MODIFIED_SINCE, "Wed, 21 Oct 2015 07:28:00 GMT")),
            Precondition::NotModified
        );
        assert_eq!(
            v.evaluate(&with_header(IF_NONE_MATCH, "\"other\"")),
            Precondition::Proceed
        );
    }

    #[test]
    fn test_precondition_failed() {
        let v = validators();
        assert_eq!(
            v.evaluate(&with_header(IF_MATCH, "\"other\"")),
            Precondition::Failed
        );
        assert_eq!(
            v.evaluate(&with_header(IF_UNMODIFIED_SINCE, "Thu, 01 Jan 1970 00:00:00 GMT")),
            Precondition::Failed
        );
        assert_eq!(v.evaluate(&with_header(IF_MATCH, "*")), Precondition::Proceed);
        assert_eq!(v.evaluate(&HeaderMap::new()), Precondition::Proceed);
    }
}
