//! Response capturing
//!
//! Wraps a [`ResponseWriter`] and remembers the status and body size a handler produced,
//! so an outer layer can inspect the outcome once the handler returns.

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::StatusCode;
use std::io;

use super::sink::ResponseWriter;

/// Transparent recorder around the real response sink
///
/// Every call is forwarded unchanged. The capturer adds no buffering.
pub struct ResponseCapturer<'a> {
    original: &'a mut dyn ResponseWriter,
    status: Option<StatusCode>,
    written: u64,
}

impl<'a> ResponseCapturer<'a> {
    pub fn new(original: &'a mut dyn ResponseWriter) -> Self {
        Self {
            original,
            status: None,
            written: 0,
        }
    }

    /// First status written, if any
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Recorded status, `200 OK` when the handler never wrote anything
    pub fn status_or_ok(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Body bytes accepted by the underlying sink so far
    pub const fn written(&self) -> u64 {
        self.written
    }
}

#[async_trait]
impl ResponseWriter for ResponseCapturer<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.original.headers_mut()
    }

    fn write_head(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
        self.original.write_head(status);
    }

    async fn write(&mut self, data: Bytes) -> io::Result<usize> {
        if self.status.is_none() {
            self.write_head(StatusCode::OK);
        }
        let n = self.original.write(data).await?;
        self.written += n as u64;
        Ok(n)
    }
}
