//! In-memory response sink for handler tests

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::StatusCode;
use std::io;

use super::sink::ResponseWriter;

/// Records everything a handler writes
#[derive(Default)]
pub struct RecordingWriter {
    pub headers: HeaderMap,
    /// Every `write_head` call, in order, including superfluous ones
    pub statuses: Vec<StatusCode>,
    pub body: Vec<u8>,
    accept_limit: Option<usize>,
    fail_after: Option<usize>,
    writes: usize,
}

impl RecordingWriter {
    /// Sink accepting at most `limit` bytes per write
    pub fn accepting(limit: usize) -> Self {
        Self {
            accept_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Sink whose writes fail with `BrokenPipe` after `writes` successful ones
    pub fn failing_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::default()
        }
    }

    /// Status the client would have seen
    pub fn status(&self) -> Option<StatusCode> {
        self.statuses.first().copied()
    }
}

#[async_trait]
impl ResponseWriter for RecordingWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        self.statuses.push(status);
    }

    async fn write(&mut self, data: Bytes) -> io::Result<usize> {
        if self.fail_after.is_some_and(|limit| self.writes >= limit) {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        if self.statuses.is_empty() {
            self.statuses.push(StatusCode::OK);
        }
        self.writes += 1;
        let n = self.accept_limit.map_or(data.len(), |limit| data.len().min(limit));
        self.body.extend_from_slice(&data[..n]);
        Ok(n)
    }
}
